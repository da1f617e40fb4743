//! Listener lists for the render lifecycle.
//!
//! A [`Hook`] is a shared observer list. [`Hook::tap`] registers a listener and returns a
//! [`HookToken`]; the listener stays registered until the token is revoked or dropped.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

type Listener<E, R> = Rc<dyn Fn(&E) -> R>;

struct Listeners<E, R> {
    next_id: Cell<u64>,
    entries: RefCell<Vec<(u64, Listener<E, R>)>>,
}

pub struct Hook<E, R = ()> {
    inner: Rc<Listeners<E, R>>,
}

impl<E, R> Clone for Hook<E, R> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<E, R> Default for Hook<E, R> {
    fn default() -> Self {
        Self {
            inner: Rc::new(Listeners {
                next_id: Cell::new(0),
                entries: RefCell::new(Vec::new()),
            }),
        }
    }
}

impl<E, R> Hook<E, R> {
    pub fn len(&self) -> usize {
        self.inner.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<E, R> fmt::Debug for Hook<E, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hook")
            .field("listeners", &self.len())
            .finish()
    }
}

impl<E: 'static, R: 'static> Hook<E, R> {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use = "dropping the token removes the listener"]
    pub fn tap(&self, listener: impl Fn(&E) -> R + 'static) -> HookToken {
        let id = self.inner.next_id.get();
        self.inner.next_id.set(id + 1);
        self.inner
            .entries
            .borrow_mut()
            .push((id, Rc::new(listener)));

        let weak: Weak<Listeners<E, R>> = Rc::downgrade(&self.inner);
        HookToken {
            revoke: Some(Box::new(move || {
                if let Some(inner) = weak.upgrade() {
                    inner.entries.borrow_mut().retain(|(i, _)| *i != id);
                }
            })),
        }
    }

    /// Calls every listener in registration order. Listeners added or removed during the call
    /// take effect on the next call.
    pub fn call(&self, event: &E) -> Vec<R> {
        let snapshot: Vec<Listener<E, R>> = self
            .inner
            .entries
            .borrow()
            .iter()
            .map(|(_, l)| Rc::clone(l))
            .collect();
        snapshot.iter().map(|l| l(event)).collect()
    }
}

/// Subscription handle returned by [`Hook::tap`].
#[must_use = "dropping the token removes the listener"]
pub struct HookToken {
    revoke: Option<Box<dyn FnOnce()>>,
}

impl HookToken {
    pub fn revoke(mut self) {
        self.run();
    }

    /// Keeps the listener registered for the lifetime of the hook.
    pub fn detach(mut self) {
        self.revoke = None;
    }

    fn run(&mut self) {
        if let Some(revoke) = self.revoke.take() {
            revoke();
        }
    }
}

impl Drop for HookToken {
    fn drop(&mut self) {
        self.run();
    }
}

impl fmt::Debug for HookToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HookToken")
            .field("active", &self.revoke.is_some())
            .finish()
    }
}

/// Process-level refresh broadcast. Instances tap it; [`RefreshHub::notify_all`] asks every
/// tapped instance to re-set its data.
#[derive(Debug, Clone, Default)]
pub struct RefreshHub {
    hook: Hook<()>,
}

impl RefreshHub {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tap(&self, listener: impl Fn() + 'static) -> HookToken {
        self.hook.tap(move |_| listener())
    }

    pub fn notify_all(&self) {
        tracing::debug!(listeners = self.hook.len(), "refresh broadcast");
        self.hook.call(&());
    }

    pub fn len(&self) -> usize {
        self.hook.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hook.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn listeners_run_in_order_and_return_values() {
        let hook: Hook<i32, i32> = Hook::new();
        let _a = hook.tap(|e| e + 1);
        let _b = hook.tap(|e| e * 10);
        assert_eq!(hook.call(&2), vec![3, 20]);
    }

    #[test]
    fn debug_reports_the_listener_count() {
        let hook: Hook<i32> = Hook::new();
        let _token = hook.tap(|_| ());
        assert_eq!(format!("{hook:?}"), "Hook { listeners: 1 }");
    }

    #[test]
    fn dropping_or_revoking_the_token_unsubscribes() {
        let hits = Rc::new(Cell::new(0));
        let hook: Hook<()> = Hook::new();
        let counter = Rc::clone(&hits);
        let token = hook.tap(move |_| counter.set(counter.get() + 1));
        hook.call(&());
        token.revoke();
        hook.call(&());
        assert_eq!(hits.get(), 1);

        {
            let _scoped = hook.tap(|_| ());
            assert_eq!(hook.len(), 1);
        }
        assert!(hook.is_empty());
    }

    #[test]
    fn detached_listeners_stay_registered() {
        let hook: Hook<()> = Hook::new();
        hook.tap(|_| ()).detach();
        assert_eq!(hook.len(), 1);
    }

    #[test]
    fn listener_may_tap_during_a_call() {
        let hook: Hook<()> = Hook::new();
        let inner = hook.clone();
        let tokens = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&tokens);
        let _outer = hook.tap(move |_| sink.borrow_mut().push(inner.tap(|_| ())));
        hook.call(&());
        assert_eq!(hook.len(), 2);
        assert_eq!(tokens.borrow().len(), 1);
    }

    #[test]
    fn refresh_hub_notifies_every_tapped_instance() {
        let hub = RefreshHub::new();
        let hits = Rc::new(Cell::new(0));
        let a = Rc::clone(&hits);
        let b = Rc::clone(&hits);
        let _ta = hub.tap(move || a.set(a.get() + 1));
        let tb = hub.tap(move || b.set(b.get() + 10));
        hub.notify_all();
        drop(tb);
        hub.notify_all();
        assert_eq!(hits.get(), 12);
    }
}
