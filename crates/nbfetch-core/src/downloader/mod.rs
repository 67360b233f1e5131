//! Core segmented downloader engine.
//!
//! Runs bounded concurrent HTTP Range GETs (or one full GET when ranges are not
//! usable), writing each body straight into the `.part` file at its offset.
//! curl handles come from a shared `HandlePool` so warm connections are reused
//! across segments and tasks.

mod pool;
mod run;
mod segment;
mod single;

pub use pool::{HandlePool, PooledHandle};
pub use run::SegmentRun;
pub use segment::download_one_segment;
pub use single::download_single;

use std::time::Duration;

use curl::easy::{Easy, List};

/// Options applied to every request of one task.
#[derive(Debug, Clone)]
pub struct CurlOptions {
    /// Extra request headers, in send order.
    pub headers: Vec<(String, String)>,
    pub connect_timeout: Duration,
    pub verify_tls: bool,
    /// Receive cap in bytes/s for one connection; 0 = unlimited.
    pub max_recv_speed: u64,
}

impl Default for CurlOptions {
    fn default() -> Self {
        Self {
            headers: Vec::new(),
            connect_timeout: Duration::from_secs(30),
            verify_tls: true,
            max_recv_speed: 0,
        }
    }
}

impl CurlOptions {
    /// Reset `easy` and configure it for a GET of `url`. Reset keeps the
    /// handle's connection cache.
    pub fn apply(&self, easy: &mut Easy, url: &str) -> Result<(), curl::Error> {
        easy.reset();
        easy.url(url)?;
        easy.follow_location(true)?;
        easy.connect_timeout(self.connect_timeout)?;
        // Stall detection instead of a wall-clock timeout: large files on slow
        // links must not be killed mid-transfer.
        easy.low_speed_limit(1)?;
        easy.low_speed_time(Duration::from_secs(60))?;
        easy.ssl_verify_peer(self.verify_tls)?;
        easy.ssl_verify_host(self.verify_tls)?;
        if self.max_recv_speed > 0 {
            easy.max_recv_speed(self.max_recv_speed)?;
        }
        if !self.headers.is_empty() {
            let mut list = List::new();
            for (k, v) in &self.headers {
                list.append(&format!("{}: {}", k.trim(), v.trim()))?;
            }
            easy.http_headers(list)?;
        }
        // Needed for the progress callback that polls the cancel token.
        easy.progress(true)?;
        Ok(())
    }

    /// Copy with the per-task rate cap split evenly over `connections`.
    pub fn with_rate_split(&self, per_task: u64, connections: usize) -> Self {
        let mut out = self.clone();
        out.max_recv_speed = if per_task == 0 {
            0
        } else {
            (per_task / connections.max(1) as u64).max(1)
        };
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_split_divides_evenly() {
        let opts = CurlOptions::default();
        assert_eq!(opts.with_rate_split(0, 5).max_recv_speed, 0);
        assert_eq!(opts.with_rate_split(1000, 4).max_recv_speed, 250);
        assert_eq!(opts.with_rate_split(1000, 0).max_recv_speed, 1000);
        assert_eq!(opts.with_rate_split(3, 5).max_recv_speed, 1);
    }

    #[test]
    fn apply_accepts_headers() {
        let opts = CurlOptions {
            headers: vec![("User-Agent".into(), "nbfetch-test".into())],
            ..CurlOptions::default()
        };
        let mut easy = Easy::new();
        opts.apply(&mut easy, "http://127.0.0.1:9/a.whl").unwrap();
    }
}
