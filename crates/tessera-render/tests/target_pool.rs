//! Render target pool lifecycle: reuse, identity and resize propagation.

use tessera_core::geometry::Size;
use tessera_render::{RenderConfig, RenderError, RenderTargetPool};
use tessera_test_utils::MockRenderContext;

fn pool(ctx: &MockRenderContext, width: u32, height: u32) -> RenderTargetPool {
    RenderTargetPool::new(ctx, &RenderConfig::default(), Size::new(width, height))
}

#[test]
fn class_dimensions_halve_per_step() {
    let ctx = MockRenderContext::new();
    let mut pool = pool(&ctx, 1280, 720);

    let sizes: Vec<_> = (0..=4)
        .map(|class| {
            let handle = pool.allocate(&ctx, class).unwrap();
            pool.target(handle).size()
        })
        .collect();

    assert_eq!(
        sizes,
        vec![
            Size::new(1280, 720),
            Size::new(640, 360),
            Size::new(320, 180),
            Size::new(160, 90),
            Size::new(80, 45),
        ]
    );
}

#[test]
fn tiny_back_buffer_never_yields_empty_targets() {
    let ctx = MockRenderContext::new();
    let mut pool = pool(&ctx, 5, 3);

    let handle = pool.allocate(&ctx, 4).unwrap();

    assert_eq!(pool.target(handle).size(), Size::new(1, 1));
}

#[test]
fn concurrent_allocations_are_distinct() {
    let ctx = MockRenderContext::new();
    let mut pool = pool(&ctx, 640, 480);

    let a = pool.allocate(&ctx, 1).unwrap();
    let b = pool.allocate(&ctx, 1).unwrap();

    assert_ne!(a, b);
    assert_ne!(pool.target(a).id(), pool.target(b).id());
    assert_eq!(pool.in_use_count(1), 2);
}

#[test]
fn steady_state_frames_construct_nothing() {
    let ctx = MockRenderContext::new();
    let mut pool = pool(&ctx, 640, 480);

    for _ in 0..3 {
        let scene = pool.allocate(&ctx, 0).unwrap();
        let blur = pool.allocate(&ctx, 2).unwrap();
        pool.release(scene).unwrap();
        let blur2 = pool.allocate(&ctx, 2).unwrap();
        pool.release(blur).unwrap();
        pool.release(blur2).unwrap();
    }

    assert_eq!(pool.total_targets(), 3);
    assert_eq!(ctx.count_texture_creates(), 3);
    assert_eq!(pool.total_in_use(), 0);
}

#[test]
fn resize_rebuilds_targets_and_keeps_handles() {
    let ctx = MockRenderContext::new();
    let mut pool = pool(&ctx, 800, 600);
    let held = pool.allocate(&ctx, 1).unwrap();
    let free = pool.allocate(&ctx, 0).unwrap();
    pool.release(free).unwrap();
    let (held_id, free_id) = (pool.target(held).id(), pool.target(free).id());

    assert!(pool.resize(&ctx, 1024, 768));

    assert_eq!(pool.size(), Size::new(1024, 768));
    assert_ne!(pool.target(held).id(), held_id);
    assert_ne!(pool.target(free).id(), free_id);
    assert_eq!(pool.target(held).size(), Size::new(512, 384));
    assert_eq!(pool.target(free).texture().width(), 1024);
    assert_eq!(pool.in_use_count(1), 1);
    assert_eq!(pool.available_count(0), 1);
    assert_eq!(ctx.count_texture_creates(), 4);

    pool.release(held).unwrap();
    assert_eq!(pool.total_in_use(), 0);
}

#[test]
fn foreign_release_is_rejected() {
    let ctx = MockRenderContext::new();
    let mut first = pool(&ctx, 64, 64);
    let mut second = pool(&ctx, 64, 64);
    let a = first.allocate(&ctx, 0).unwrap();
    second.allocate(&ctx, 0).unwrap();
    second.release_all();

    assert_eq!(
        second.release(a),
        Err(RenderError::TargetNotInUse {
            size_class: 0,
            index: 0
        })
    );
    assert!(first.release(a).is_ok());
}
