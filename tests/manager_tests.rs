//! CanvasManager end to end with the headless device.

use std::sync::Arc;
use std::thread;

use megacanvas_core::{CanvasConfig, Flavor, PoolPolicy, Surface};
use megacanvas_device::HeadlessDevice;
use megacanvas_manager::{CanvasManager, ManagerDiagnostics};

fn manager() -> CanvasManager<HeadlessDevice> {
    let device = Arc::new(HeadlessDevice::new());
    device.bind_render_thread();
    CanvasManager::new(
        device,
        CanvasConfig {
            min_size: 16,
            max_size: 2048,
            multisample_count: 4,
            pool: PoolPolicy {
                capacity: 4,
                padding: 128,
                squish_interval: 1000,
                max_age: 500,
                cull_target: 2,
            },
        },
    )
    .expect("valid config")
}

#[test]
fn test_every_surface_within_bounds() {
    let m = manager();
    for (w, h) in [(16, 16), (2000, 16), (2048, 2048), (1500, 700)] {
        for flavor in Flavor::ALL {
            let r = m.get(flavor, w, h).unwrap().unwrap();
            let s = r.surface();
            assert!((16..=2048).contains(&s.width()));
            assert!((16..=2048).contains(&s.height()));
            assert!(s.width() >= w && s.height() >= h);
        }
    }
    assert!(m.get(Flavor::Standard, 15, 100).unwrap().is_none());
    assert!(m.get(Flavor::Multisampled, 100, 2049).unwrap().is_none());
}

#[test]
fn test_tick_drives_every_pool() {
    let mut m = manager();
    m.get(Flavor::Standard, 100, 100).unwrap().unwrap().release();
    m.get(Flavor::Multisampled, 100, 100).unwrap().unwrap().release();
    for _ in 0..499 {
        m.tick();
    }
    assert_eq!(m.pool(Flavor::Standard).idle_count(), 1);
    assert_eq!(m.pool(Flavor::Multisampled).idle_count(), 1);
    m.tick();
    assert_eq!(m.pool(Flavor::Standard).idle_count(), 0);
    assert_eq!(m.pool(Flavor::Multisampled).idle_count(), 0);
    assert_eq!(m.total_memory(), 0);
    assert_eq!(m.frame(), 500);
}

#[test]
fn test_diagnostics_report_each_pool() {
    let mut m = manager();
    m.add_pool("cache", false).unwrap();

    let held = m.get(Flavor::Multisampled, 100, 100).unwrap().unwrap();
    m.get(Flavor::Standard, 100, 100).unwrap().unwrap().release();
    m.named("cache").unwrap().get(1000, 20).unwrap().unwrap().release();
    m.tick();

    let d = m.diagnostics();
    assert_eq!(d.frame, 1);
    let labels: Vec<_> = d.pools.iter().map(|p| p.label.as_str()).collect();
    assert_eq!(labels, ["MAIN", "MSAA", "CACHE"]);

    let msaa = d.pool("MSAA").unwrap();
    assert!(msaa.multisampled);
    assert_eq!(msaa.stats.used, 1);
    assert_eq!(msaa.stats.used_bytes, held.bytes());
    assert_eq!(d.used_bytes(), held.bytes());
    assert_eq!(d.total_bytes(), m.total_memory());

    let text = d.to_string();
    assert!(text.contains("Pool MAIN Available: 1\n"), "{text}");
    assert!(text.contains("Pool MSAA Used: 1\n"), "{text}");
    assert!(text.contains("Pool CACHE Memory: 0 B / "), "{text}");

    let json = d.to_json().unwrap();
    let back: ManagerDiagnostics = serde_json::from_str(&json).unwrap();
    assert_eq!(back, d);
}

#[test]
fn test_regions_released_after_dispose_are_destroyed() {
    let m = manager();
    let held = m.get(Flavor::Standard, 300, 300).unwrap().unwrap();
    m.get(Flavor::Standard, 600, 600).unwrap().unwrap().release();

    m.dispose();
    assert_eq!(m.total_memory(), held.bytes());

    thread::spawn(move || held.release())
        .join()
        .expect("Thread panicked");
    let pool = m.pool(Flavor::Standard);
    assert_eq!(pool.idle_count(), 0);
    assert_eq!(m.device().stats().live, 1, "destroyed on the next render-thread call");

    m.flush();
    assert_eq!(m.total_memory(), 0);
    assert!(pool.accounting_consistent());
    let dev = m.device().stats();
    assert_eq!(dev.live, 0);
    assert_eq!(dev.foreign_thread_calls, 0);
}

#[test]
fn test_dropping_manager_destroys_idle_surfaces() {
    let m = manager();
    let device = Arc::clone(m.device());
    m.get(Flavor::Standard, 300, 300).unwrap().unwrap().release();
    m.get(Flavor::Multisampled, 40, 40).unwrap().unwrap().release();
    assert_eq!(device.stats().live, 2);

    drop(m);
    let dev = device.stats();
    assert_eq!(dev.live, 0);
    assert_eq!(dev.destroyed, 2);
}
