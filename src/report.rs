use std::collections::BTreeMap;
use std::io::{self, BufRead, Write};

use serde_derive::{Deserialize, Serialize};

use crate::error::Error;
use crate::score::frame_score;

const CSV_HEADER: &str = "segment,vehicle,pedestrian,animal,pothole,timestamp,score";

/// Per-frame observation, immutable once appended. `timestamp` is
/// `frame_index / fps` in seconds.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct FrameRecord {
    pub frame_index: u64,
    pub vehicle: u32,
    pub pedestrian: u32,
    pub animal: u32,
    pub pothole: bool,
    pub score: u8,
    pub timestamp: f64,
}

/// Worst-case counts observed inside one fixed-length time window, plus the
/// score of those counts. `timestamp` is the first frame's timestamp in the
/// window.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct SegmentRecord {
    pub segment: u64,
    pub vehicle: u32,
    pub pedestrian: u32,
    pub animal: u32,
    pub pothole: bool,
    pub timestamp: f64,
    pub score: u8,
}

/// Ordered segment table for one video.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct SegmentReport {
    segments: Vec<SegmentRecord>,
}

impl SegmentReport {
    /// Group frame records into `segment_size`-second windows keyed by
    /// `floor(timestamp / segment_size)` and keep the per-window maxima.
    ///
    /// Segments are windows of wall-clock time, not frame counts, so their
    /// length in frames may vary when fps is non-integral. A frame at
    /// exactly `k * segment_size` lands in segment `k`. An empty frame
    /// sequence yields an empty table.
    pub fn from_frames(frames: &[FrameRecord], segment_size: f64) -> Result<Self, Error> {
        if !(segment_size > 0.0) || !segment_size.is_finite() {
            return Err(Error::InvalidSegmentSize(segment_size));
        }

        let mut windows: BTreeMap<u64, SegmentRecord> = BTreeMap::new();

        for frame in frames {
            let segment = (frame.timestamp / segment_size).floor() as u64;

            windows
                .entry(segment)
                .and_modify(|seg| {
                    seg.vehicle = seg.vehicle.max(frame.vehicle);
                    seg.pedestrian = seg.pedestrian.max(frame.pedestrian);
                    seg.animal = seg.animal.max(frame.animal);
                    seg.pothole |= frame.pothole;
                })
                .or_insert(SegmentRecord {
                    segment,
                    vehicle: frame.vehicle,
                    pedestrian: frame.pedestrian,
                    animal: frame.animal,
                    pothole: frame.pothole,
                    timestamp: frame.timestamp,
                    score: 0,
                });
        }

        let segments = windows
            .into_values()
            .map(|mut seg| {
                seg.score = frame_score(seg.vehicle, seg.pedestrian, seg.animal, seg.pothole);
                seg
            })
            .collect();

        Ok(Self { segments })
    }

    #[inline]
    pub fn segments(&self) -> &[SegmentRecord] {
        &self.segments
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Headline metric: arithmetic mean of segment scores, 0.0 for an
    /// empty report.
    pub fn average_score(&self) -> f64 {
        if self.segments.is_empty() {
            return 0.0;
        }

        let sum: u32 = self.segments.iter().map(|s| s.score as u32).sum();
        sum as f64 / self.segments.len() as f64
    }

    /// Write the table as CSV: header row, one row per segment, numeric
    /// fields unquoted, no index column.
    pub fn write_csv<W: Write>(&self, mut out: W) -> io::Result<()> {
        writeln!(out, "{}", CSV_HEADER)?;

        for seg in &self.segments {
            writeln!(
                out,
                "{},{},{},{},{},{},{}",
                seg.segment,
                seg.vehicle,
                seg.pedestrian,
                seg.animal,
                seg.pothole as u8,
                seg.timestamp,
                seg.score
            )?;
        }

        Ok(())
    }

    /// Parse a table previously produced by [`write_csv`](Self::write_csv).
    pub fn parse_csv<R: BufRead>(input: R) -> Result<Self, Error> {
        let mut lines = input.lines();

        match lines.next() {
            None => return Ok(Self::default()),
            Some(header) => {
                let header = header?;
                if header.trim_end() != CSV_HEADER {
                    return Err(Error::Report(format!("unexpected header {:?}", header)));
                }
            }
        }

        fn field<T: std::str::FromStr>(raw: &str, name: &str) -> Result<T, Error> {
            raw.trim()
                .parse()
                .map_err(|_| Error::Report(format!("bad {} value {:?}", name, raw)))
        }

        let mut segments = Vec::new();

        for line in lines {
            let line = line?;
            if line.is_empty() {
                continue;
            }

            let fields: Vec<&str> = line.split(',').collect();
            if fields.len() != 7 {
                return Err(Error::Report(format!(
                    "expected 7 fields, got {}: {:?}",
                    fields.len(),
                    line
                )));
            }

            segments.push(SegmentRecord {
                segment: field(fields[0], "segment")?,
                vehicle: field(fields[1], "vehicle")?,
                pedestrian: field(fields[2], "pedestrian")?,
                animal: field(fields[3], "animal")?,
                pothole: field::<u8>(fields[4], "pothole")? != 0,
                timestamp: field(fields[5], "timestamp")?,
                score: field(fields[6], "score")?,
            });
        }

        Ok(Self { segments })
    }
}
