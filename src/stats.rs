/// Per-worker search counters.
///
/// Each pool worker owns one instance and updates it without synchronization;
/// the driver merges all of them after the pool has gone quiescent.
#[derive(Debug, Default, Clone, Copy)]
pub struct Stats {
    pub total_bytes: u64,
    pub total_files: u64,
    pub total_matches: u64,
    pub total_file_matches: u64,
}

impl Stats {
    pub fn record_file(&mut self, bytes: u64, matches: u64) {
        self.total_bytes += bytes;
        self.total_files += 1;
        self.total_matches += matches;
        if matches > 0 {
            self.total_file_matches += 1;
        }
    }

    pub fn merge(&mut self, other: &Stats) {
        self.total_bytes += other.total_bytes;
        self.total_files += other.total_files;
        self.total_matches += other.total_matches;
        self.total_file_matches += other.total_file_matches;
    }
}
