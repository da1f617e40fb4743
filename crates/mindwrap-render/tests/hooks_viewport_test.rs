use mindwrap_core::{MindmapOptions, PayloadNode, Transformer};
use mindwrap_render::geom::size;
use mindwrap_render::{
    FoldOverride, GestureInput, GestureKind, LayoutEngine, Padding, WheelEvent, ZoomCause,
    ZoomTransform,
};
use std::cell::RefCell;
use std::rc::Rc;

fn scenario() -> PayloadNode {
    Transformer::default().transform_markdown("# Title\n- a\n- b\n  - c", None)
}

fn engine_with(options: MindmapOptions) -> LayoutEngine {
    LayoutEngine::new(&options).with_viewport(size(400.0, 300.0))
}

#[test]
fn before_render_overrides_apply_on_full_renders() {
    let mut engine = engine_with(MindmapOptions::default());
    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&seen);
    let _token = engine.hooks().before_render.tap(move |event| {
        sink.borrow_mut().push(event.origin_path.clone());
        if event.origin_path.is_some() {
            return Vec::new();
        }
        vec![FoldOverride {
            path: "1.3".into(),
            folded: true,
        }]
    });

    engine.set_data(Some(scenario()), None).expect("render");
    assert_eq!(engine.is_folded("1.3"), Some(true));
    assert!(engine.frame().expect("frame").node("1.3.4").is_none());

    engine.toggle_node("1.3", false).expect("expand");
    assert_eq!(engine.is_folded("1.3"), Some(false));
    assert_eq!(*seen.borrow(), vec![None, Some("1.3".to_string())]);
}

#[test]
fn toggle_hook_reports_annotated_descendants() {
    let data = PayloadNode::new("root").with_children(vec![
        PayloadNode::new("a").with_children(vec![
            PayloadNode::new("x").with_fold(mindwrap_core::Fold::Collapsed),
            PayloadNode::new("y"),
        ]),
    ]);
    let mut engine = engine_with(MindmapOptions::default());
    let events = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&events);
    let _token = engine
        .hooks()
        .toggle_node
        .tap(move |event| sink.borrow_mut().push(event.clone()));

    engine.set_data(Some(data), None).expect("render");
    engine.toggle_node("1.2", true).expect("collapse");
    engine.toggle_node("1.2", false).expect("expand");

    let events = events.borrow();
    assert_eq!(events.len(), 2);
    assert!(!events[0].expand);
    assert!(events[0].recursive);
    assert_eq!(events[0].annotated_descendants, vec!["1.2.3".to_string()]);
    assert!(events[1].expand);
    assert!(events[1].annotated_descendants.is_empty());
}

#[test]
fn after_render_reports_node_counts() {
    let mut engine = engine_with(MindmapOptions::default());
    let counts = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&counts);
    let token = engine
        .hooks()
        .after_render
        .tap(move |event| sink.borrow_mut().push(event.nodes));

    engine.set_data(Some(scenario()), None).expect("render");
    engine.toggle_node("1.3", false).expect("collapse");
    token.revoke();
    engine.refresh().expect("refresh");
    assert_eq!(*counts.borrow(), vec![4, 3]);
}

#[test]
fn zoom_hook_tags_each_cause() {
    let mut engine = engine_with(MindmapOptions::default());
    let causes = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&causes);
    let _token = engine
        .hooks()
        .on_zoom
        .tap(move |event| sink.borrow_mut().push(event.cause));

    engine.set_data(Some(scenario()), None).expect("render");
    engine.rescale(1.25);
    engine.handle_wheel(&WheelEvent {
        delta_x: 0.0,
        delta_y: 10.0,
        ctrl: false,
    });

    assert_eq!(
        *causes.borrow(),
        vec![ZoomCause::Fit, ZoomCause::Rescale, ZoomCause::Gesture]
    );
    assert!(!ZoomCause::Fit.is_user_driven());
    assert!(ZoomCause::Rescale.is_user_driven());
}

#[test]
fn wheel_pans_when_scroll_for_pan_is_set() {
    let options = MindmapOptions {
        scroll_for_pan: Some(true),
        auto_fit: Some(false),
        ..MindmapOptions::default()
    };
    let mut engine = engine_with(options);
    engine.set_data(Some(scenario()), None).expect("render");
    assert_eq!(engine.transform(), ZoomTransform::IDENTITY);

    let panned = engine
        .handle_wheel(&WheelEvent {
            delta_x: 5.0,
            delta_y: 20.0,
            ctrl: false,
        })
        .expect("pan");
    assert_eq!(panned, ZoomTransform::new(-5.0, -20.0, 1.0));

    let zoomed = engine
        .handle_wheel(&WheelEvent {
            delta_x: 0.0,
            delta_y: -50.0,
            ctrl: true,
        })
        .expect("zoom");
    assert!(zoomed.k > 1.0);
}

#[test]
fn disabled_pan_and_zoom_ignore_input() {
    let options = MindmapOptions {
        pan: Some(false),
        zoom: Some(false),
        ..MindmapOptions::default()
    };
    let mut engine = engine_with(options);
    engine.set_data(Some(scenario()), None).expect("render");
    let before = engine.transform();
    assert!(
        engine
            .handle_wheel(&WheelEvent {
                delta_x: 1.0,
                delta_y: 1.0,
                ctrl: false,
            })
            .is_none()
    );
    let drag = GestureInput {
        kind: GestureKind::Drag,
        ctrl: false,
        button: 0,
    };
    assert!(
        engine
            .handle_zoom_gesture(&drag, ZoomTransform::new(3.0, 3.0, 1.0))
            .is_none()
    );
    assert_eq!(engine.transform(), before);
}

#[test]
fn ensure_view_pans_only_when_needed() {
    let options = MindmapOptions {
        auto_fit: Some(false),
        ..MindmapOptions::default()
    };
    let mut engine = engine_with(options);
    engine.set_data(Some(scenario()), None).expect("render");

    engine.fit(Some(ZoomTransform::new(200.0, 150.0, 1.0)));
    assert!(engine.ensure_view("1", Padding::default()).is_none());

    let c = engine.frame().expect("frame").node("1.3.4").expect("c").clone();
    let moved = engine
        .ensure_view("1.3.4", Padding::uniform(10.0))
        .expect("pan");
    assert_eq!(moved.k, 1.0);
    let right = (c.y + c.y_size - engine.options().spacing_horizontal + 2.0) + moved.x;
    assert!((right - (400.0 - 10.0)).abs() < 1e-9);

    assert!(engine.ensure_view("1.9", Padding::default()).is_none());
}

#[test]
fn refresh_hub_reaches_tapped_engines() {
    let hub = mindwrap_render::RefreshHub::new();
    let engine = Rc::new(RefCell::new(engine_with(MindmapOptions::default())));
    engine
        .borrow_mut()
        .set_data(Some(scenario()), None)
        .expect("render");
    engine.borrow_mut().toggle_node("1.3", false).expect("collapse");

    let weak = Rc::downgrade(&engine);
    let _token = hub.tap(move || {
        if let Some(engine) = weak.upgrade() {
            if let Ok(mut engine) = engine.try_borrow_mut() {
                let _ = engine.refresh();
            }
        }
    });
    hub.notify_all();
    let engine = engine.borrow();
    assert_eq!(engine.is_folded("1.3"), Some(true));
    assert!(engine.frame().expect("frame").origin_path.is_none());
}
