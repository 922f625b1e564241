// /////////////////////////////////////////////////////////////////////////////
// Media Transcode Worker
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! `estimate_nb_pkt_preload`: how many packets to pre-load in the next batch,
//! so remote reads are amortized across round-trips instead of one packet at
//! a time.

/// Until every stream has at least this many pre-loaded packet-index
/// entries, the estimator is in its "initial" phase.
pub const DEFAULT_NUM_INIT_PKTS: usize = 8;

/// Per-stream packet-index bookkeeping the estimator walks over.
#[derive(Debug, Clone, Copy, Default)]
pub struct StreamPreloadStats {
    pub preloading: usize,
    pub preloaded: usize,
    pub fetched: usize,
}

/// Caps how many bytes a single preload batch may accumulate once every
/// stream is past its initial packet count.
#[derive(Debug, Clone, Copy)]
pub struct AsyncLimit {
    pub max_nbytes_bulk: u64,
}

/// Walks the farthest-behind stream one packet at a time, applying whichever
/// continue-predicate is active, and returns how many packets to pre-load in
/// this batch. Named identically to the source design: `streams` is indexed
/// by stream-id, `avg_pkt_size` approximates bytes-per-packet for the
/// "subsequent" phase's byte-budget check.
pub fn estimate_nb_pkt_preload(streams: &[StreamPreloadStats], async_limit: AsyncLimit, avg_pkt_size: u64) -> usize {
    if streams.is_empty() {
        return 0;
    }

    let initial_phase = streams.iter().any(|s| s.preloaded < DEFAULT_NUM_INIT_PKTS);

    let mut nb_pkts = 0usize;
    let mut accumulated_bytes = 0u64;
    loop {
        let continue_walk = if initial_phase {
            streams.iter().any(|s| s.preloaded + nb_pkts < DEFAULT_NUM_INIT_PKTS)
        } else {
            accumulated_bytes < async_limit.max_nbytes_bulk
        };
        if !continue_walk {
            break;
        }
        nb_pkts += 1;
        accumulated_bytes += avg_pkt_size.max(1);

        // Guard against an unbounded walk if avg_pkt_size underestimates;
        // this mirrors the source's bulk byte cap being the hard stop in
        // the subsequent phase.
        if !initial_phase && nb_pkts > 100_000 {
            break;
        }
    }
    nb_pkts
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn initial_phase_stops_once_every_stream_has_min_packets() {
        let streams = [
            StreamPreloadStats {
                preloaded: 2,
                ..Default::default()
            },
            StreamPreloadStats {
                preloaded: 5,
                ..Default::default()
            },
        ];
        let limit = AsyncLimit { max_nbytes_bulk: 4096 };
        let n = estimate_nb_pkt_preload(&streams, limit, 500);
        // Stream 0 needs DEFAULT_NUM_INIT_PKTS - 2 more packets to catch up.
        assert_eq!(n, DEFAULT_NUM_INIT_PKTS - 2);
    }

    #[test]
    fn subsequent_phase_stops_at_byte_budget() {
        let streams = [StreamPreloadStats {
            preloaded: DEFAULT_NUM_INIT_PKTS,
            ..Default::default()
        }];
        let limit = AsyncLimit { max_nbytes_bulk: 1000 };
        let n = estimate_nb_pkt_preload(&streams, limit, 300);
        assert_eq!(n, 4); // 4 * 300 = 1200 >= 1000, 3 * 300 = 900 < 1000
    }

    #[test]
    fn no_streams_preloads_nothing() {
        let limit = AsyncLimit { max_nbytes_bulk: 1000 };
        assert_eq!(estimate_nb_pkt_preload(&[], limit, 300), 0);
    }
}
