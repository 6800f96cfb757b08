//! JSONL writer for passes - one file per pass
//!
//! `<base>/<mission>/<phase>/c<cycle>/<mission><tag>p<pass>c<cycle>.jsonl`
//!
//! The first line is the pass header, then one line per variable. NaN is
//! written as `null`. Re-running replaces the file.

use super::backend::{
    staged_mut, take_staged, MissionContext, PassHandle, PassMetadata, PassWriterBackend,
    StagedPass, WriterError,
};
use crate::epoch::format_iso;
use serde::Serialize;
use std::collections::HashSet;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

#[derive(Serialize)]
struct PassHeader<'a> {
    mission: &'a str,
    tag: &'a str,
    #[serde(flatten)]
    meta: &'a PassMetadata,
    start_iso: String,
    end_iso: String,
    equator_iso: String,
    variables: Vec<&'a str>,
}

#[derive(Serialize)]
struct VariableLine<'a> {
    name: &'a str,
    values: Vec<Option<f64>>,
}

pub struct JsonlPassWriter {
    base_path: PathBuf,
    mission: Option<MissionContext>,
    phases: HashSet<String>,
    open: Option<StagedPass>,
    next_handle: u64,
}

impl JsonlPassWriter {
    pub fn new(base_path: impl Into<PathBuf>) -> Result<Self, WriterError> {
        let base_path = base_path.into();
        fs::create_dir_all(&base_path)?;
        log::info!("📝 Writing passes to: {}", base_path.display());

        Ok(Self {
            base_path,
            mission: None,
            phases: HashSet::new(),
            open: None,
            next_handle: 1,
        })
    }

    fn mission(&self) -> Result<&MissionContext, WriterError> {
        self.mission
            .as_ref()
            .ok_or_else(|| WriterError::InvalidState("mission context not initialized".to_string()))
    }

    fn pass_path(&self, mission: &MissionContext, meta: &PassMetadata) -> PathBuf {
        self.base_path
            .join(&mission.id)
            .join(&meta.phase)
            .join(format!("c{:03}", meta.cycle))
            .join(format!(
                "{}{}p{:04}c{:03}.jsonl",
                mission.id, mission.tag, meta.pass, meta.cycle
            ))
    }

    fn write_pass(path: &Path, mission: &MissionContext, staged: &StagedPass) -> Result<(), WriterError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut out = BufWriter::new(File::create(path)?);

        let meta = &staged.meta;
        let header = PassHeader {
            mission: &mission.id,
            tag: &mission.tag,
            meta,
            start_iso: format_iso(meta.start_time),
            end_iso: format_iso(meta.end_time),
            equator_iso: format_iso(meta.equator_time),
            variables: staged.written().map(|(name, _)| name).collect(),
        };
        writeln!(out, "{}", serde_json::to_string(&header)?)?;

        for (name, values) in staged.written() {
            let line = VariableLine {
                name,
                values: values.iter().map(|v| v.is_finite().then_some(*v)).collect(),
            };
            writeln!(out, "{}", serde_json::to_string(&line)?)?;
        }

        out.flush()?;
        Ok(())
    }
}

impl PassWriterBackend for JsonlPassWriter {
    fn init_mission(&mut self, mission: &str, tag: &str) -> Result<(), WriterError> {
        fs::create_dir_all(self.base_path.join(mission))?;
        self.mission = Some(MissionContext {
            id: mission.to_string(),
            tag: tag.to_string(),
        });
        self.phases.clear();
        Ok(())
    }

    fn phase(&mut self, name: &str) -> Result<(), WriterError> {
        if self.phases.contains(name) {
            return Ok(());
        }
        let dir = self.base_path.join(&self.mission()?.id).join(name);
        fs::create_dir_all(&dir)?;
        log::debug!("Phase directory ready: {}", dir.display());
        self.phases.insert(name.to_string());
        Ok(())
    }

    fn begin_pass(&mut self, meta: &PassMetadata) -> Result<PassHandle, WriterError> {
        self.mission()?;
        if let Some(open) = &self.open {
            return Err(WriterError::InvalidState(format!(
                "pass {:?} is still open",
                open.handle
            )));
        }
        let handle = PassHandle(self.next_handle);
        self.next_handle += 1;
        self.open = Some(StagedPass::new(handle, meta.clone()));
        Ok(handle)
    }

    fn define_variable(&mut self, pass: PassHandle, name: &str) -> Result<(), WriterError> {
        staged_mut(&mut self.open, pass)?.define(name);
        Ok(())
    }

    fn put_values(&mut self, pass: PassHandle, name: &str, values: &[f64]) -> Result<(), WriterError> {
        staged_mut(&mut self.open, pass)?.put(name, values)
    }

    fn close_pass(&mut self, pass: PassHandle) -> Result<String, WriterError> {
        let staged = take_staged(&mut self.open, pass)?;
        let mission = self.mission()?.clone();
        let path = self.pass_path(&mission, &staged.meta);
        Self::write_pass(&path, &mission, &staged)?;
        Ok(path.display().to_string())
    }

    fn shutdown(&mut self) -> Result<(), WriterError> {
        if let Some(open) = self.open.take() {
            log::warn!(
                "Discarding unclosed pass c{:03} p{:04}",
                open.meta.cycle,
                open.meta.pass
            );
        }
        self.mission = None;
        Ok(())
    }

    fn backend_type(&self) -> &'static str {
        "JSONL"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{BufRead, BufReader};
    use tempfile::tempdir;

    fn meta() -> PassMetadata {
        PassMetadata {
            phase: "a".to_string(),
            cycle: 7,
            pass: 42,
            orbit: 900,
            start_time: 1.0e9,
            end_time: 1.0e9 + 2.0,
            equator_time: 1.0e9 + 1.0,
            equator_lon: 212.5,
            records: 3,
            source: "G1 G2".to_string(),
            baseline: "F".to_string(),
        }
    }

    fn write_one(writer: &mut JsonlPassWriter, height: &[f64]) -> String {
        writer.phase("a").unwrap();
        let h = writer.begin_pass(&meta()).unwrap();
        writer.define_variable(h, "time").unwrap();
        writer.define_variable(h, "height").unwrap();
        writer.put_values(h, "time", &[1.0e9, 1.0e9 + 1.0, 1.0e9 + 2.0]).unwrap();
        writer.put_values(h, "height", height).unwrap();
        writer.close_pass(h).unwrap()
    }

    #[test]
    fn test_jsonl_pass_layout() {
        let dir = tempdir().unwrap();
        let mut writer = JsonlPassWriter::new(dir.path()).unwrap();
        writer.init_mission("ra", "a").unwrap();

        let path = write_one(&mut writer, &[1.5, f64::NAN, 2.5]);
        assert!(path.ends_with("ra/a/c007/raap0042c007.jsonl"));

        let lines: Vec<String> = BufReader::new(File::open(&path).unwrap())
            .lines()
            .map(|l| l.unwrap())
            .collect();
        assert_eq!(lines.len(), 3);

        let header: serde_json::Value = serde_json::from_str(&lines[0]).unwrap();
        assert_eq!(header["mission"], "ra");
        assert_eq!(header["cycle"], 7);
        assert_eq!(header["pass"], 42);
        assert_eq!(header["source"], "G1 G2");

        let height: serde_json::Value = serde_json::from_str(&lines[2]).unwrap();
        assert_eq!(height["name"], "height");
        assert_eq!(height["values"], serde_json::json!([1.5, null, 2.5]));
    }

    #[test]
    fn test_rerun_overwrites_pass_file() {
        let dir = tempdir().unwrap();
        let mut writer = JsonlPassWriter::new(dir.path()).unwrap();
        writer.init_mission("ra", "a").unwrap();

        write_one(&mut writer, &[1.0, 1.0, 1.0]);
        let path = write_one(&mut writer, &[2.0, 2.0, 2.0]);

        let text = fs::read_to_string(&path).unwrap();
        assert_eq!(text.lines().count(), 3);
        assert!(text.contains("[2.0,2.0,2.0]"));
    }

    #[test]
    fn test_pass_requires_mission() {
        let dir = tempdir().unwrap();
        let mut writer = JsonlPassWriter::new(dir.path()).unwrap();
        assert!(writer.begin_pass(&meta()).is_err());
    }
}
