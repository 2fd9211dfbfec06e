//! Surface pool behaviour: reuse, padding, bounds, and eviction.


use megacanvas_core::{RegionRect, Surface};
use megacanvas_device::HeadlessDevice;
use megacanvas_pool::Error;
use rand::Rng;
use test_support::{assert_accounting, policy, pool, pool_with, random_size, seeded};

#[test]
fn test_out_of_bounds_requests_change_nothing() {
    let (device, pool) = pool(policy(4, 1000, 500, 2));
    pool.get(100, 100).unwrap().unwrap().release();
    let before = pool.stats();

    for (w, h) in [(7, 100), (100, 7), (0, 0), (1025, 10), (10, 1025), (u32::MAX, u32::MAX)] {
        assert!(pool.get(w, h).unwrap().is_none(), "{w}x{h} must be rejected");
    }

    assert_eq!(pool.stats(), before);
    assert_eq!(device.stats().created, 1);
}

#[test]
fn test_bounds_are_inclusive() {
    let (_device, pool) = pool(policy(4, 1000, 500, 2));
    let lo = pool.get(8, 8).unwrap().expect("min size accepted");
    let hi = pool.get(1024, 1024).unwrap().expect("max size accepted");
    assert_eq!(hi.surface_size(), (1024, 1024), "padding clamps to max_size");
    assert_eq!(lo.surface_size(), (64, 64));
}

#[test]
fn test_surface_never_smaller_than_request() {
    let (_device, pool) = pool(policy(16, 1000, 500, 8));
    let mut rng = seeded(11);
    let mut held = Vec::new();
    for _ in 0..300 {
        let (w, h) = (random_size(&mut rng), random_size(&mut rng));
        let region = pool.get(w, h).unwrap().unwrap();
        let (sw, sh) = region.surface_size();
        assert!(sw >= w && sh >= h, "{sw}x{sh} backs a {w}x{h} request");
        assert_eq!(region.rect(), RegionRect::sized(w, h));
        if rng.gen_range(0..2) == 0 {
            held.push(region);
        }
        if held.len() > 8 {
            drop(held.remove(rng.gen_range(0..held.len())));
        }
    }
}

#[test]
fn test_round_trip_returns_same_surface() {
    let (device, pool) = pool(policy(4, 1000, 500, 2));
    let first = pool.get(50, 50).unwrap().unwrap();
    let id = first.id();
    let serial = first.surface().serial();
    first.release();

    let second = pool.get(50, 50).unwrap().unwrap();
    assert_eq!(second.id(), id);
    assert_eq!(second.surface().serial(), serial);
    assert_eq!(device.stats().created, 1);
    assert_eq!(pool.stats().reuses, 1);
}

#[test]
fn test_single_fitting_surface_is_reused() {
    let (device, pool) = pool(policy(4, 1000, 500, 2));
    let big = pool.get(400, 300).unwrap().unwrap();
    let (bw, bh) = big.surface_size();
    big.release();

    let smaller = pool.get(bw, bh - 10).unwrap().unwrap();
    assert_eq!(smaller.surface_size(), (bw, bh));
    assert_eq!(device.stats().created, 1);
}

#[test]
fn test_smallest_fit_prefers_tightest_surface() {
    let (device, pool) = pool(policy(8, 1000, 500, 4));
    let large = pool.get(500, 500).unwrap().unwrap();
    let medium = pool.get(200, 200).unwrap().unwrap();
    let small = pool.get(100, 100).unwrap().unwrap();
    let (large_id, medium_id, small_id) = (large.id(), medium.id(), small.id());
    large.release();
    medium.release();
    small.release();

    let a = pool.get(90, 90).unwrap().unwrap();
    assert_eq!(a.id(), small_id);
    let b = pool.get(150, 150).unwrap().unwrap();
    assert_eq!(b.id(), medium_id);
    let c = pool.get(150, 150).unwrap().unwrap();
    assert_eq!(c.id(), large_id);
    assert_eq!(device.stats().created, 3);

    // Nothing idle fits any more: a fresh surface is created.
    let d = pool.get(20, 20).unwrap().unwrap();
    assert_eq!(device.stats().created, 4);
    assert_eq!(pool.stats().allocations, 4);
    drop((a, b, c, d));
}

#[test]
fn test_accounting_holds_across_random_sequences() {
    for seed in 1..=8 {
        let (device, pool) = pool(policy(6, 25, 12, 3));
        let mut rng = seeded(seed);
        let mut held = Vec::new();

        for _ in 0..1500 {
            match rng.gen_range(0..5) {
                0 | 1 => {
                    let (w, h) = (random_size(&mut rng), random_size(&mut rng));
                    if let Some(r) = pool.get(w, h).unwrap() {
                        held.push(r);
                    }
                }
                2 | 3 if !held.is_empty() => {
                    let i = rng.gen_range(0..held.len());
                    held.swap_remove(i).release();
                }
                _ => pool.tick(),
            }
            assert_accounting(&pool);
            let st = pool.stats();
            assert_eq!(st.used, held.len());
            assert!(st.idle <= st.capacity);
        }

        held.clear();
        pool.flush();
        assert_accounting(&pool);
        let st = pool.stats();
        assert_eq!(st.used_bytes, 0);
        assert_eq!(device.stats().live_bytes, st.total_bytes);
        assert_eq!(device.stats().unknown_destroys, 0);
    }
}

#[test]
fn test_idle_surface_ages_out_after_max_age_ticks() {
    let (device, pool) = pool(policy(4, 1000, 5, 2));
    let r = pool.get(64, 64).unwrap().unwrap();
    let id = r.id();
    r.release();

    for _ in 0..4 {
        pool.tick();
    }
    assert_eq!(pool.idle_ids(), vec![id]);

    pool.tick();
    let st = pool.stats();
    assert_eq!(st.idle, 0);
    assert_eq!(st.aged_out, 1);
    assert_eq!(st.total_bytes, 0);
    assert_eq!(device.stats().destroyed, 1);

    let again = pool.get(64, 64).unwrap().unwrap();
    assert_ne!(again.id(), id);
    assert_eq!(device.stats().created, 2);
}

#[test]
fn test_reuse_resets_age() {
    let (_device, pool) = pool(policy(4, 1000, 5, 2));
    pool.get(64, 64).unwrap().unwrap().release();
    for _ in 0..4 {
        pool.tick();
    }
    // Checking the surface out and back in restarts its idle clock.
    pool.get(64, 64).unwrap().unwrap().release();
    for _ in 0..4 {
        pool.tick();
    }
    assert_eq!(pool.stats().idle, 1);
    assert_eq!(pool.stats().aged_out, 0);
}

#[test]
fn test_periodic_squish_caps_idle_table() {
    let (device, pool) = pool(policy(8, 10, 1000, 3));
    let regions: Vec<_> = (0..8).map(|i| pool.get(10 + i, 10).unwrap().unwrap()).collect();
    drop(regions);
    assert_eq!(pool.stats().idle, 8);

    for _ in 0..9 {
        pool.tick();
    }
    assert_eq!(pool.stats().idle, 8, "no squish before the interval");

    pool.tick();
    let st = pool.stats();
    assert_eq!(st.idle, 3);
    assert_eq!(st.squished, 5);
    assert_eq!(device.stats().live, 3);
    assert_accounting(&pool);

    // The counter restarts after a squish.
    let regions: Vec<_> = (0..8).map(|i| pool.get(10 + i, 10).unwrap().unwrap()).collect();
    drop(regions);
    for _ in 0..9 {
        pool.tick();
    }
    assert_eq!(pool.stats().idle, 8);
}

#[test]
fn test_burst_cull_forces_squish_on_next_tick() {
    let (device, pool) = pool(policy(2, 1000, 500, 1));
    let regions: Vec<_> = (0..3).map(|i| pool.get(10 + i, 10).unwrap().unwrap()).collect();
    let culled_bytes = regions[2].bytes();
    drop(regions);

    let st = pool.stats();
    assert!(st.cull_pending);
    assert_eq!(st.idle, 2);
    assert_eq!(st.burst_culled, 1);
    assert_eq!(st.total_bytes, st.peak_total_bytes - culled_bytes);

    // Destruction waits for a render-thread call.
    assert_eq!(device.stats().destroyed, 0);
    assert_eq!(st.pending_destroy, 1);

    pool.tick();
    let st = pool.stats();
    assert!(!st.cull_pending);
    assert_eq!(st.squished, 1);
    assert_eq!(st.idle, 1);
    assert_eq!(st.pending_destroy, 0);
    assert_eq!(device.stats().destroyed, 2);
    assert_accounting(&pool);
}

#[test]
fn test_capacity_four_scenario() {
    let (device, pool) = pool(policy(4, 1000, 500, 2));
    let sizes = [10, 70, 130, 200, 260, 330];
    let regions: Vec<_> = sizes
        .iter()
        .map(|&s| pool.get(s, s).unwrap().unwrap())
        .collect();
    let kept: u64 = regions[..4].iter().map(|r| r.bytes()).sum();
    let ids: Vec<_> = regions.iter().map(|r| r.id()).collect();

    for r in regions {
        r.release();
    }

    let st = pool.stats();
    assert_eq!(st.idle, 4);
    assert_eq!(st.used, 0);
    assert_eq!(st.burst_culled, 2);
    assert_eq!(st.total_bytes, kept);
    assert_eq!(pool.idle_ids(), ids[..4].to_vec());

    pool.flush();
    let dev = device.stats();
    assert_eq!(dev.live, 4);
    assert_eq!(dev.live_bytes, kept);
}

#[test]
fn test_device_failure_leaves_pool_untouched() {
    let (_device, pool) = pool_with(
        HeadlessDevice::with_memory_limit(64 * 64 * 4),
        policy(4, 1000, 500, 2),
    );
    let held = pool.get(10, 10).unwrap().unwrap();
    let before = pool.stats();

    let err = pool.get(10, 10).unwrap_err();
    assert!(matches!(err, Error::Alloc { width: 64, height: 64, .. }), "{err}");
    assert_eq!(pool.stats(), before);

    held.release();
    assert!(pool.get(10, 10).unwrap().is_some(), "idle surface still reusable");
}

#[test]
fn test_dispose_destroys_idle_and_retires_outstanding_on_release() {
    let (device, pool) = pool(policy(4, 1000, 500, 2));
    let kept = pool.get(30, 30).unwrap().unwrap();
    pool.get(300, 300).unwrap().unwrap().release();
    pool.get(600, 600).unwrap().unwrap().release();

    pool.dispose();
    let st = pool.stats();
    assert_eq!(st.idle, 0);
    assert_eq!(st.used, 1);
    assert_eq!(st.total_bytes, kept.bytes());
    assert_eq!(device.stats().live, 1);

    kept.release();
    let st = pool.stats();
    assert_eq!(st.idle, 0, "released after dispose is not pooled");
    assert_eq!(st.used, 0);
    assert_eq!(st.total_bytes, 0);
    assert_eq!(st.pending_destroy, 1);
    pool.flush();
    assert_eq!(device.stats().live, 0);
    assert_accounting(&pool);
}
