mod builder;
mod config;
mod simplify;
