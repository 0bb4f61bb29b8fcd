use anyhow::Result;

use std::fs::{create_dir_all, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use histwx_core::{SampleEnvelope, SampleSink};

/// Appends changed samples to a JSONL file, one envelope per line.
pub struct FsSink {
    _dir: PathBuf,
    file: PathBuf,
}

impl FsSink {
    pub fn new<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        create_dir_all(&dir)?;
        let file = dir.join("samples.jsonl");
        Ok(Self { _dir: dir, file })
    }
}

#[async_trait::async_trait]
impl SampleSink for FsSink {
    async fn emit(&mut self, envelope: &SampleEnvelope) -> Result<()> {
        let mut f = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.file)?;
        let line = serde_json::to_string(envelope)?;
        f.write_all(line.as_bytes())?;
        f.write_all(b"\n")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use histwx_core::ResolvedSample;

    fn envelope() -> SampleEnvelope {
        SampleEnvelope {
            location: "berlin".to_string(),
            offset_days: 365,
            offset_hours: 0,
            record_timestamp: "2024-01-02 00:00".to_string(),
            resolved_at: chrono::Utc::now(),
            sample: ResolvedSample {
                temperature: 3.0,
                humidity: 90.0,
                windspeed: 20.0,
                pressure: 1001.0,
                condition: "Heavy rain. Overcast.".to_string(),
                rain: 5,
                sky: 18,
                moon: 0,
            },
        }
    }

    #[tokio::test]
    async fn writes_jsonl() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = FsSink::new(dir.path()).unwrap();
        sink.emit(&envelope()).await.unwrap();
        sink.emit(&envelope()).await.unwrap();

        let content = std::fs::read_to_string(dir.path().join("samples.jsonl")).unwrap();
        assert_eq!(content.lines().count(), 2);

        let first: SampleEnvelope = serde_json::from_str(content.lines().next().unwrap()).unwrap();
        assert_eq!(first.location, "berlin");
        assert_eq!(first.sample.rain, 5);
    }
}
