//! Synthetic frame workload: a render loop checking out regions while worker
//! threads hand some of them back asynchronously.

use std::collections::VecDeque;
use std::sync::mpsc;
use std::sync::Arc;
use std::thread;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use megacanvas_core::{CanvasConfig, Flavor};
use megacanvas_device::{DeviceStats, HeadlessDevice};
use megacanvas_manager::{CanvasManager, ManagerDiagnostics, Region};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimOptions {
    pub frames: u64,
    pub workers: usize,
    pub seed: u64,
    /// Upper bound on requests per regular frame.
    pub per_frame: u32,
    /// Largest requested edge; values past `max_size` exercise rejection.
    pub max_request: u32,
    /// Every `burst_every` frames, request `burst_size` regions at once (0 disables).
    pub burst_every: u64,
    pub burst_size: u32,
    /// Longest a render-thread-held region lives, in frames.
    pub hold_frames: u32,
}

impl Default for SimOptions {
    fn default() -> Self {
        Self {
            frames: 600,
            workers: 2,
            seed: 1,
            per_frame: 6,
            max_request: 1024,
            burst_every: 120,
            burst_size: 96,
            hold_frames: 8,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimReport {
    pub frames: u64,
    pub requested: u64,
    pub rejected: u64,
    pub sent_to_workers: u64,
    pub device: DeviceStats,
    pub diagnostics: ManagerDiagnostics,
    /// `total == used + idle` held in every pool after every frame.
    pub accounting_consistent: bool,
    /// Device memory matches what the pools account for after the final flush.
    pub device_matches_pools: bool,
}

impl SimReport {
    pub fn healthy(&self) -> bool {
        self.accounting_consistent
            && self.device_matches_pools
            && self.device.foreign_thread_calls == 0
            && self.device.unknown_destroys == 0
    }
}

pub fn run(config: CanvasConfig, opts: &SimOptions) -> Result<SimReport, Box<dyn std::error::Error>> {
    let device = Arc::new(HeadlessDevice::new());
    device.bind_render_thread();
    let mut manager = CanvasManager::new(Arc::clone(&device), config)?;
    let mut rng = StdRng::seed_from_u64(opts.seed);

    let mut senders = Vec::with_capacity(opts.workers);
    let mut handles = Vec::with_capacity(opts.workers);
    for i in 0..opts.workers {
        let (tx, rx) = mpsc::channel::<Region<HeadlessDevice>>();
        senders.push(tx);
        let handle = thread::Builder::new()
            .name(format!("release-worker-{i}"))
            .spawn(move || {
                for region in rx {
                    region.release();
                }
            })?;
        handles.push(handle);
    }

    let mut held: VecDeque<(u64, Region<HeadlessDevice>)> = VecDeque::new();
    let mut requested = 0u64;
    let mut rejected = 0u64;
    let mut sent = 0u64;
    let mut consistent = true;

    for frame in 0..opts.frames {
        let burst = opts.burst_every > 0 && frame > 0 && frame % opts.burst_every == 0;
        let count = if burst {
            opts.burst_size
        } else {
            rng.gen_range(0..=opts.per_frame)
        };

        for _ in 0..count {
            let flavor = if rng.gen_ratio(1, 4) {
                Flavor::Multisampled
            } else {
                Flavor::Standard
            };
            let w = rng.gen_range(1..=opts.max_request.max(1));
            let h = rng.gen_range(1..=opts.max_request.max(1));
            requested += 1;
            let Some(region) = manager.get(flavor, w, h)? else {
                rejected += 1;
                continue;
            };
            match rng.gen_range(0..3) {
                0 => region.release(),
                1 if !senders.is_empty() => {
                    let tx = &senders[rng.gen_range(0..senders.len())];
                    // A closed channel hands the region back; dropping it releases here.
                    if tx.send(region).is_ok() {
                        sent += 1;
                    }
                }
                _ => {
                    let until = frame + u64::from(rng.gen_range(0..=opts.hold_frames));
                    held.push_back((until, region));
                }
            }
        }

        held.retain(|(until, _)| *until > frame);
        manager.tick();

        consistent &= Flavor::ALL
            .iter()
            .all(|f| manager.pool(*f).accounting_consistent());
    }

    drop(senders);
    for handle in handles {
        if handle.join().is_err() {
            tracing::error!("release worker panicked");
            consistent = false;
        }
    }
    held.clear();
    manager.flush();

    let device_stats = device.stats();
    let device_matches_pools = device_stats.live_bytes == manager.total_memory();
    consistent &= Flavor::ALL
        .iter()
        .all(|f| manager.pool(*f).accounting_consistent());

    tracing::info!(
        frames = opts.frames,
        requested,
        rejected,
        live = device_stats.live,
        "simulation finished"
    );

    Ok(SimReport {
        frames: opts.frames,
        requested,
        rejected,
        sent_to_workers: sent,
        device: device_stats,
        diagnostics: manager.diagnostics(),
        accounting_consistent: consistent,
        device_matches_pools,
    })
}
