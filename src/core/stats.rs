use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

use super::decision::UnmapReason;

#[derive(Default, Debug)]
pub struct ReasonCounters {
    high_depth: AtomicU64,
    soft_clip: AtomicU64,
    chimeric: AtomicU64,
}

impl ReasonCounters {
    pub fn add(&self, reason: UnmapReason) {
        let counter = match reason {
            UnmapReason::None => return,
            UnmapReason::HighDepth => &self.high_depth,
            UnmapReason::SoftClip => &self.soft_clip,
            UnmapReason::Chimeric => &self.chimeric,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn get(&self, reason: UnmapReason) -> u64 {
        match reason {
            UnmapReason::None => 0,
            UnmapReason::HighDepth => self.high_depth.load(Ordering::Relaxed),
            UnmapReason::SoftClip => self.soft_clip.load(Ordering::Relaxed),
            UnmapReason::Chimeric => self.chimeric.load(Ordering::Relaxed),
        }
    }

    pub fn total(&self) -> u64 {
        [UnmapReason::HighDepth, UnmapReason::SoftClip, UnmapReason::Chimeric].into_iter().map(|x| self.get(x)).sum()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Route {
    Relocated,
    FullyUnmapped,
}

/// Counters shared by every worker during one run.
#[derive(Default, Debug)]
pub struct UnmapStats {
    /// Primary reads unmapped, by reason
    pub reads: ReasonCounters,
    /// Secondary alignments dropped, by reason
    pub secondary: ReasonCounters,
    /// Supplementary alignments dropped, by their own reason
    pub supplementary: ReasonCounters,
    supplementary_by_alternate: AtomicU64,
    mates: AtomicU64,
    alternates_cleared: AtomicU64,
    relocated: AtomicU64,
    fully_unmapped: AtomicU64,
    drained: AtomicU64,
    inspected: AtomicU64,
    anomalies: AtomicU64,
    cursor_fallbacks: AtomicU64,
    tasks: AtomicU64,
}

macro_rules! counter {
    ($inc:ident, $get:ident, $field:ident) => {
        pub fn $inc(&self, n: u64) {
            self.$field.fetch_add(n, Ordering::Relaxed);
        }

        pub fn $get(&self) -> u64 {
            self.$field.load(Ordering::Relaxed)
        }
    };
}

impl UnmapStats {
    counter!(add_supplementary_by_alternate, supplementary_by_alternate, supplementary_by_alternate);
    counter!(add_mates, mates, mates);
    counter!(add_alternates_cleared, alternates_cleared, alternates_cleared);
    counter!(add_drained, drained, drained);
    counter!(add_inspected, inspected, inspected);
    counter!(add_anomalies, anomalies, anomalies);
    counter!(add_cursor_fallbacks, cursor_fallbacks, cursor_fallbacks);
    counter!(add_tasks, tasks, tasks);

    pub fn routed(&self, route: Route) {
        match route {
            Route::Relocated => self.relocated.fetch_add(1, Ordering::Relaxed),
            Route::FullyUnmapped => self.fully_unmapped.fetch_add(1, Ordering::Relaxed),
        };
    }

    pub fn written(&self, route: Route) -> u64 {
        match route {
            Route::Relocated => self.relocated.load(Ordering::Relaxed),
            Route::FullyUnmapped => self.fully_unmapped.load(Ordering::Relaxed),
        }
    }

    pub fn high_depth_count(&self) -> u64 {
        self.reads.get(UnmapReason::HighDepth)
    }

    pub fn long_soft_clip_count(&self) -> u64 {
        self.reads.get(UnmapReason::SoftClip)
    }

    pub fn chimeric_count(&self) -> u64 {
        self.reads.get(UnmapReason::Chimeric)
    }

    pub fn summary(&self) -> UnmapSummary {
        UnmapSummary {
            tasks: self.tasks(),
            inspected: self.inspected(),
            high_depth: self.high_depth_count(),
            soft_clip: self.long_soft_clip_count(),
            chimeric: self.chimeric_count(),
            mates: self.mates(),
            secondary_dropped: self.secondary.total(),
            supplementary_dropped: self.supplementary.total() + self.supplementary_by_alternate(),
            alternates_cleared: self.alternates_cleared(),
            relocated: self.written(Route::Relocated),
            fully_unmapped: self.written(Route::FullyUnmapped),
            drained: self.drained(),
            anomalies: self.anomalies(),
            cursor_fallbacks: self.cursor_fallbacks(),
        }
    }
}

/// Plain snapshot of the counters, one TSV row in the stats report.
#[derive(Serialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct UnmapSummary {
    pub tasks: u64,
    pub inspected: u64,
    pub high_depth: u64,
    pub soft_clip: u64,
    pub chimeric: u64,
    pub mates: u64,
    pub secondary_dropped: u64,
    pub supplementary_dropped: u64,
    pub alternates_cleared: u64,
    pub relocated: u64,
    pub fully_unmapped: u64,
    pub drained: u64,
    pub anomalies: u64,
    pub cursor_fallbacks: u64,
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;

    use super::*;

    #[test]
    fn concurrent() {
        let stats = Arc::new(UnmapStats::default());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let stats = Arc::clone(&stats);
                thread::spawn(move || {
                    for _ in 0..1000 {
                        stats.reads.add(UnmapReason::HighDepth);
                        stats.reads.add(UnmapReason::None);
                        stats.routed(Route::Relocated);
                        stats.add_mates(2);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(stats.high_depth_count(), 8000);
        assert_eq!(stats.reads.total(), 8000);
        assert_eq!(stats.written(Route::Relocated), 8000);
        assert_eq!(stats.mates(), 16000);
    }

    #[test]
    fn summary() {
        let stats = UnmapStats::default();
        stats.reads.add(UnmapReason::SoftClip);
        stats.reads.add(UnmapReason::Chimeric);
        stats.supplementary.add(UnmapReason::HighDepth);
        stats.add_supplementary_by_alternate(2);
        stats.routed(Route::FullyUnmapped);

        let summary = stats.summary();
        assert_eq!(summary.soft_clip, 1);
        assert_eq!(summary.chimeric, 1);
        assert_eq!(summary.high_depth, 0);
        assert_eq!(summary.supplementary_dropped, 3);
        assert_eq!(summary.fully_unmapped, 1);
        assert_eq!(summary.relocated, 0);
    }
}
