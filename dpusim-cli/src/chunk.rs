//! Filenames and file I/O for the host/simulator exchange directory: `num_executions.txt` plus
//! the per-DPU `input_*`/`output_*` chunk files.
//!
//! Grounded on spec.md's "Host/simulator inputs" list: each chunk filename encodes a chunk
//! type, execution index, DPU id, and either a pointer name (`DPU_HOST`) or a byte offset
//! (`DPU_MRAM_HEAP_POINTER_NAME`).

use std::path::{Path, PathBuf};

use util::ByteStream;

/// Which host-visible address space a chunk targets.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChunkKind {
    DpuHost,
    DpuMramHeapPointerName,
}

impl ChunkKind {
    fn tag(self) -> &'static str {
        match self {
            ChunkKind::DpuHost => "DPU_HOST",
            ChunkKind::DpuMramHeapPointerName => "DPU_MRAM_HEAP_POINTER_NAME",
        }
    }
}

/// Identifies one chunk file: its direction (input/output) is encoded by the caller, not here.
#[derive(Clone, Debug)]
pub struct ChunkId {
    pub kind: ChunkKind,
    pub execution: u32,
    pub dpu_id: u32,
    /// Symbol name for [`ChunkKind::DpuHost`], byte offset (as a decimal string) for
    /// [`ChunkKind::DpuMramHeapPointerName`].
    pub locator: String,
}

fn filename(direction: &str, id: &ChunkId) -> String {
    format!(
        "{direction}_{}_exec{}_dpu{}_{}.txt",
        id.kind.tag(),
        id.execution,
        id.dpu_id,
        id.locator
    )
}

pub fn input_path(bin_dirpath: &Path, id: &ChunkId) -> PathBuf {
    bin_dirpath.join(filename("input", id))
}

pub fn output_path(bin_dirpath: &Path, id: &ChunkId) -> PathBuf {
    bin_dirpath.join(filename("output", id))
}

pub fn read_chunk(path: &Path) -> Result<ByteStream, ChunkError> {
    let text = std::fs::read_to_string(path)?;
    Ok(ByteStream::from_decimal_lines(&text)?)
}

pub fn write_chunk(path: &Path, bytes: &ByteStream) -> Result<(), ChunkError> {
    std::fs::write(path, bytes.to_decimal_lines())?;
    Ok(())
}

pub fn read_num_executions(bin_dirpath: &Path) -> Result<u32, ChunkError> {
    let text = std::fs::read_to_string(bin_dirpath.join("num_executions.txt"))?;
    Ok(text.trim().parse()?)
}

/// Scans `bin_dirpath` for every `input_*` chunk belonging to `kind`/`execution`/`dpu_id` and
/// returns its locator (pointer name or offset string). Used to discover which buffers a given
/// execution transfers without the caller having to know their names ahead of time.
pub fn discover_locators(bin_dirpath: &Path, kind: ChunkKind, execution: u32, dpu_id: u32) -> Result<Vec<String>, ChunkError> {
    let prefix = format!("input_{}_exec{execution}_dpu{dpu_id}_", kind.tag());
    let mut out = Vec::new();

    for entry in std::fs::read_dir(bin_dirpath)? {
        let name = entry?.file_name().to_string_lossy().to_string();
        if let Some(rest) = name.strip_prefix(&prefix) {
            if let Some(locator) = rest.strip_suffix(".txt") {
                out.push(locator.to_string());
            }
        }
    }

    Ok(out)
}

#[derive(thiserror::Error, Debug)]
pub enum ChunkError {
    #[error("failed to read/write chunk file: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed chunk contents: {0}")]
    Decimal(#[from] std::num::ParseIntError),
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn chunk_round_trips_through_a_tempfile() {
        let dir = tempfile::tempdir().unwrap();
        let id = ChunkId {
            kind: ChunkKind::DpuHost,
            execution: 0,
            dpu_id: 3,
            locator: "input_buffer".to_string(),
        };
        let path = input_path(dir.path(), &id);

        let mut bytes = ByteStream::new();
        bytes.extend_from_slice(&[1, 2, 3, 4]);
        write_chunk(&path, &bytes).unwrap();

        let read_back = read_chunk(&path).unwrap();
        assert_eq!(read_back.as_slice(), bytes.as_slice());
    }

    #[test]
    fn filenames_encode_kind_execution_dpu_and_locator() {
        let id = ChunkId {
            kind: ChunkKind::DpuMramHeapPointerName,
            execution: 2,
            dpu_id: 5,
            locator: "128".to_string(),
        };
        assert_eq!(
            filename("output", &id),
            "output_DPU_MRAM_HEAP_POINTER_NAME_exec2_dpu5_128.txt"
        );
    }
}
