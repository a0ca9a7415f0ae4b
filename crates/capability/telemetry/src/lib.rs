//! 追踪初始化与进程级计数器。

use std::sync::OnceLock;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing_subscriber::{EnvFilter, fmt};

/// 计数器快照。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub datagrams_received: u64,
    pub datagrams_rejected: u64,
    pub datagrams_inactive: u64,
    pub datagrams_dropped: u64,
    pub frames_multi_point: u64,
    pub frames_single_point: u64,
    pub frames_duplicate: u64,
    pub frames_ignored: u64,
    pub points_decoded: u64,
    pub bulk_writes: u64,
    pub bulk_write_latency_ms_total: u64,
    pub bulk_write_latency_ms_count: u64,
    pub commands_received: u64,
    pub commands_delivered: u64,
    pub commands_cancelled: u64,
    pub promotions: u64,
    pub demotions: u64,
}

/// 进程级计数器。
pub struct TelemetryMetrics {
    datagrams_received: AtomicU64,
    datagrams_rejected: AtomicU64,
    datagrams_inactive: AtomicU64,
    datagrams_dropped: AtomicU64,
    frames_multi_point: AtomicU64,
    frames_single_point: AtomicU64,
    frames_duplicate: AtomicU64,
    frames_ignored: AtomicU64,
    points_decoded: AtomicU64,
    bulk_writes: AtomicU64,
    bulk_write_latency_ms_total: AtomicU64,
    bulk_write_latency_ms_count: AtomicU64,
    commands_received: AtomicU64,
    commands_delivered: AtomicU64,
    commands_cancelled: AtomicU64,
    promotions: AtomicU64,
    demotions: AtomicU64,
}

impl TelemetryMetrics {
    pub fn new() -> Self {
        Self {
            datagrams_received: AtomicU64::new(0),
            datagrams_rejected: AtomicU64::new(0),
            datagrams_inactive: AtomicU64::new(0),
            datagrams_dropped: AtomicU64::new(0),
            frames_multi_point: AtomicU64::new(0),
            frames_single_point: AtomicU64::new(0),
            frames_duplicate: AtomicU64::new(0),
            frames_ignored: AtomicU64::new(0),
            points_decoded: AtomicU64::new(0),
            bulk_writes: AtomicU64::new(0),
            bulk_write_latency_ms_total: AtomicU64::new(0),
            bulk_write_latency_ms_count: AtomicU64::new(0),
            commands_received: AtomicU64::new(0),
            commands_delivered: AtomicU64::new(0),
            commands_cancelled: AtomicU64::new(0),
            promotions: AtomicU64::new(0),
            demotions: AtomicU64::new(0),
        }
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            datagrams_received: self.datagrams_received.load(Ordering::Relaxed),
            datagrams_rejected: self.datagrams_rejected.load(Ordering::Relaxed),
            datagrams_inactive: self.datagrams_inactive.load(Ordering::Relaxed),
            datagrams_dropped: self.datagrams_dropped.load(Ordering::Relaxed),
            frames_multi_point: self.frames_multi_point.load(Ordering::Relaxed),
            frames_single_point: self.frames_single_point.load(Ordering::Relaxed),
            frames_duplicate: self.frames_duplicate.load(Ordering::Relaxed),
            frames_ignored: self.frames_ignored.load(Ordering::Relaxed),
            points_decoded: self.points_decoded.load(Ordering::Relaxed),
            bulk_writes: self.bulk_writes.load(Ordering::Relaxed),
            bulk_write_latency_ms_total: self.bulk_write_latency_ms_total.load(Ordering::Relaxed),
            bulk_write_latency_ms_count: self.bulk_write_latency_ms_count.load(Ordering::Relaxed),
            commands_received: self.commands_received.load(Ordering::Relaxed),
            commands_delivered: self.commands_delivered.load(Ordering::Relaxed),
            commands_cancelled: self.commands_cancelled.load(Ordering::Relaxed),
            promotions: self.promotions.load(Ordering::Relaxed),
            demotions: self.demotions.load(Ordering::Relaxed),
        }
    }
}

impl Default for TelemetryMetrics {
    fn default() -> Self {
        Self::new()
    }
}

static METRICS: OnceLock<TelemetryMetrics> = OnceLock::new();

/// 获取全局计数器实例。
pub fn metrics() -> &'static TelemetryMetrics {
    METRICS.get_or_init(TelemetryMetrics::new)
}

/// 初始化 tracing（RUST_LOG，默认 info）。
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt().with_env_filter(filter).try_init();
}

/// 记录收到的 UDP 报文。
pub fn record_datagram_received() {
    metrics().datagrams_received.fetch_add(1, Ordering::Relaxed);
}

/// 记录来源不在白名单内的报文。
pub fn record_datagram_rejected() {
    metrics().datagrams_rejected.fetch_add(1, Ordering::Relaxed);
}

/// 记录备用状态下读取后丢弃的报文。
pub fn record_datagram_inactive() {
    metrics().datagrams_inactive.fetch_add(1, Ordering::Relaxed);
}

/// 记录队列满丢弃的报文。
pub fn record_datagram_dropped() {
    metrics().datagrams_dropped.fetch_add(1, Ordering::Relaxed);
}

pub fn record_multi_point_frame() {
    metrics().frames_multi_point.fetch_add(1, Ordering::Relaxed);
}

pub fn record_single_point_frame() {
    metrics().frames_single_point.fetch_add(1, Ordering::Relaxed);
}

/// 记录重复单点帧。
pub fn record_duplicate_frame() {
    metrics().frames_duplicate.fetch_add(1, Ordering::Relaxed);
}

/// 记录被忽略的帧（未知签名、未知 ASDU、长度不足）。
pub fn record_ignored_frame() {
    metrics().frames_ignored.fetch_add(1, Ordering::Relaxed);
}

pub fn record_points_decoded(count: u64) {
    metrics().points_decoded.fetch_add(count, Ordering::Relaxed);
}

/// 记录一次批量写入及其耗时（毫秒）。
pub fn record_bulk_write(latency_ms: u64) {
    let metrics = metrics();
    metrics.bulk_writes.fetch_add(1, Ordering::Relaxed);
    metrics
        .bulk_write_latency_ms_total
        .fetch_add(latency_ms, Ordering::Relaxed);
    metrics
        .bulk_write_latency_ms_count
        .fetch_add(1, Ordering::Relaxed);
}

pub fn record_command_received() {
    metrics().commands_received.fetch_add(1, Ordering::Relaxed);
}

pub fn record_command_delivered() {
    metrics().commands_delivered.fetch_add(1, Ordering::Relaxed);
}

pub fn record_command_cancelled() {
    metrics().commands_cancelled.fetch_add(1, Ordering::Relaxed);
}

/// 记录备用 → 激活。
pub fn record_promotion() {
    metrics().promotions.fetch_add(1, Ordering::Relaxed);
}

/// 记录激活 → 备用。
pub fn record_demotion() {
    metrics().demotions.fetch_add(1, Ordering::Relaxed);
}
