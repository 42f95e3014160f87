//! Dense `f32` tensors stored as NumPy `.npy` (format 1.0, `<f4`, C order).

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;
use std::sync::Arc;

use anyhow::{anyhow, bail, ensure, Context, Result};

const MAGIC: &[u8] = b"\x93NUMPY";
const HEADER_ALIGN: usize = 64;

#[derive(Clone, Debug, PartialEq)]
pub struct Tensor {
    shape: Vec<usize>,
    data: Vec<f32>,
}

/// Applied to every tensor a dataset view loads.
pub type TensorTransform = Arc<dyn Fn(Tensor) -> Tensor + Send + Sync>;

impl Tensor {
    pub fn new(shape: Vec<usize>, data: Vec<f32>) -> Result<Self> {
        let expected: usize = shape.iter().product();
        ensure!(
            expected == data.len(),
            "shape {shape:?} needs {expected} values, got {}",
            data.len()
        );
        Ok(Self { shape, data })
    }

    #[must_use]
    pub fn vector(data: Vec<f32>) -> Self {
        Self {
            shape: vec![data.len()],
            data,
        }
    }

    pub(crate) fn matrix(rows: usize, cols: usize, data: Vec<f32>) -> Self {
        debug_assert_eq!(rows * cols, data.len());
        Self {
            shape: vec![rows, cols],
            data,
        }
    }

    #[must_use]
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    #[must_use]
    pub fn data(&self) -> &[f32] {
        &self.data
    }

    #[must_use]
    pub fn into_data(self) -> Vec<f32> {
        self.data
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn write_npy(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        let file =
            File::create(path).with_context(|| format!("failed to create {}", path.display()))?;
        let mut out = BufWriter::new(file);
        out.write_all(&encode_header(&self.shape)?)?;
        for value in &self.data {
            out.write_all(&value.to_le_bytes())?;
        }
        out.flush()
            .with_context(|| format!("failed to write {}", path.display()))?;
        Ok(())
    }

    pub fn read_npy(path: &Path) -> Result<Self> {
        let file = File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
        let mut input = BufReader::new(file);
        let shape =
            read_header(&mut input).with_context(|| format!("bad npy header in {}", path.display()))?;
        let count: usize = shape.iter().product();
        let mut bytes = Vec::with_capacity(count * 4);
        input.read_to_end(&mut bytes)?;
        ensure!(
            bytes.len() == count * 4,
            "{} holds {} data bytes, shape {shape:?} needs {}",
            path.display(),
            bytes.len(),
            count * 4
        );
        let data = bytes
            .chunks_exact(4)
            .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
            .collect();
        Ok(Self { shape, data })
    }
}

fn encode_header(shape: &[usize]) -> Result<Vec<u8>> {
    let dims = match shape {
        [single] => format!("({single},)"),
        _ => format!(
            "({})",
            shape
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", ")
        ),
    };
    let mut dict = format!("{{'descr': '<f4', 'fortran_order': False, 'shape': {dims}, }}");
    // magic + version + u16 length + dict + trailing newline
    let unpadded = MAGIC.len() + 2 + 2 + dict.len() + 1;
    let padding = (HEADER_ALIGN - unpadded % HEADER_ALIGN) % HEADER_ALIGN;
    dict.push_str(&" ".repeat(padding));
    dict.push('\n');
    let len = u16::try_from(dict.len()).map_err(|_| anyhow!("npy header too long"))?;

    let mut header = Vec::with_capacity(MAGIC.len() + 4 + dict.len());
    header.extend_from_slice(MAGIC);
    header.extend_from_slice(&[1, 0]);
    header.extend_from_slice(&len.to_le_bytes());
    header.extend_from_slice(dict.as_bytes());
    Ok(header)
}

fn read_header(input: &mut impl Read) -> Result<Vec<usize>> {
    let mut preamble = [0_u8; 10];
    input.read_exact(&mut preamble)?;
    ensure!(&preamble[..6] == MAGIC, "missing npy magic");
    ensure!(preamble[6] == 1, "unsupported npy version {}", preamble[6]);
    let len = usize::from(u16::from_le_bytes([preamble[8], preamble[9]]));
    let mut dict = vec![0_u8; len];
    input.read_exact(&mut dict)?;
    let dict = String::from_utf8(dict).context("npy header is not utf-8")?;

    ensure!(
        dict.contains("'descr': '<f4'"),
        "only little-endian f32 arrays are supported"
    );
    ensure!(
        dict.contains("'fortran_order': False"),
        "fortran-ordered arrays are not supported"
    );
    let start = dict
        .find("'shape': (")
        .ok_or_else(|| anyhow!("npy header has no shape"))?
        + "'shape': (".len();
    let end = dict[start..]
        .find(')')
        .ok_or_else(|| anyhow!("unterminated npy shape"))?
        + start;
    let mut shape = Vec::new();
    for part in dict[start..end].split(',') {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }
        shape.push(
            part.parse()
                .with_context(|| format!("invalid npy dimension '{part}'"))?,
        );
    }
    if shape.is_empty() {
        bail!("scalar npy arrays are not supported");
    }
    Ok(shape)
}
