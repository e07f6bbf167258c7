//! STL reading and writing.
//!
//! Three container flavours are recognised from the first five bytes:
//!
//! * `solid` - ASCII. If ASCII decoding fails the bytes are retried as
//!   binary, which catches binary files whose header happens to start with
//!   `solid`.
//! * `COLOR` - colored binary (same record layout as binary).
//! * anything else - binary. A header that is not valid UTF-8 marks the file
//!   as colored binary.
//!
//! Binary layout:
//!
//! ```text
//! UINT8[80]    - header
//! UINT32       - number of triangles
//! foreach triangle
//!     REAL32[3] - normal
//!     REAL32[3] - vertex 1
//!     REAL32[3] - vertex 2
//!     REAL32[3] - vertex 3
//!     UINT16    - attribute byte count (color data in colored files)
//! end
//! ```

use std::fmt;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

use nalgebra::{Point3, Vector3};
use tracing::{debug, info, warn};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{MeshError, MeshResult};
use crate::mesh::Mesh;
use crate::params::LoadOptions;
use crate::triangle::Triangle;
use crate::types::RawTriangle;

/// Binary STL header size in bytes.
const HEADER_SIZE: usize = 80;

/// Size of one triangle record in binary STL.
const TRIANGLE_SIZE: usize = 50;

/// Header reported for colored binary files.
const COLORED_HEADER: &str = "Colored solid.";

/// Container flavour detected when reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum StlFormat {
    Ascii,
    Binary,
    ColoredBinary,
}

impl fmt::Display for StlFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StlFormat::Ascii => "ASCII",
            StlFormat::Binary => "binary",
            StlFormat::ColoredBinary => "colored binary",
        };
        f.write_str(name)
    }
}

/// Output encoding for the writer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum StlEncoding {
    Ascii,
    #[default]
    Binary,
}

/// Non-fatal problem found while decoding.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum LoadWarning {
    /// The binary header declared a different number of triangles than the
    /// file holds.
    CountMismatch { declared: u32, decoded: usize },
}

impl fmt::Display for LoadWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadWarning::CountMismatch { declared, decoded } => write!(
                f,
                "header declares {declared} triangles but {decoded} were decoded"
            ),
        }
    }
}

/// A decoded STL file.
#[derive(Debug, Clone, PartialEq)]
pub struct StlDocument {
    /// ASCII: the first line. Binary: the 80-byte header as text.
    pub header: String,
    pub format: StlFormat,
    /// Triangle count from the binary header, `None` for ASCII.
    pub declared_count: Option<u32>,
    /// Records in file order.
    pub records: Vec<RawTriangle>,
    pub warnings: Vec<LoadWarning>,
}

/// Read and decode an STL file.
pub fn read_stl<P: AsRef<Path>>(path: P) -> MeshResult<StlDocument> {
    let path = path.as_ref();
    let bytes = fs::read(path).map_err(|e| MeshError::IoRead {
        path: path.to_path_buf(),
        source: e,
    })?;

    let document = parse_stl(&bytes)?;

    info!(
        "Read {} triangles from {:?} ({})",
        document.records.len(),
        path,
        document.format
    );
    Ok(document)
}

/// Decode STL bytes of any supported flavour.
pub fn parse_stl(bytes: &[u8]) -> MeshResult<StlDocument> {
    let prefix = &bytes[..bytes.len().min(5)];

    let document = if prefix.eq_ignore_ascii_case(b"solid") {
        if has_binary_header(bytes) {
            parse_binary(bytes, false)?
        } else {
            match parse_ascii(bytes) {
                Ok(doc) => doc,
                Err(ascii_err) => match parse_binary(bytes, false) {
                    // Only trust the binary reading if the size matches exactly.
                    Ok(doc) if doc.warnings.is_empty() && exact_binary_size(bytes) => {
                        debug!("ASCII decoding failed ({ascii_err}), read as binary");
                        doc
                    }
                    _ => return Err(ascii_err),
                },
            }
        }
    } else if prefix.eq_ignore_ascii_case(b"color") {
        parse_binary(bytes, true)?
    } else {
        parse_binary(bytes, false)?
    };

    for warning in &document.warnings {
        warn!("{}", warning);
    }
    Ok(document)
}

/// Binary headers starting with "solid" usually still contain NUL padding.
fn has_binary_header(bytes: &[u8]) -> bool {
    bytes.len() >= HEADER_SIZE + 4 && bytes[..HEADER_SIZE].contains(&0)
}

fn exact_binary_size(bytes: &[u8]) -> bool {
    if bytes.len() < HEADER_SIZE + 4 {
        return false;
    }
    let declared = read_u32(&bytes[HEADER_SIZE..HEADER_SIZE + 4]) as usize;
    declared
        .checked_mul(TRIANGLE_SIZE)
        .and_then(|n| n.checked_add(HEADER_SIZE + 4))
        == Some(bytes.len())
}

fn parse_binary(bytes: &[u8], colored: bool) -> MeshResult<StlDocument> {
    if bytes.len() < HEADER_SIZE + 4 {
        return Err(MeshError::format(format!(
            "binary STL needs at least {} bytes, got {}",
            HEADER_SIZE + 4,
            bytes.len()
        )));
    }

    let raw_header = &bytes[..HEADER_SIZE];
    let (header, format) = if colored {
        (COLORED_HEADER.to_string(), StlFormat::ColoredBinary)
    } else {
        match std::str::from_utf8(raw_header) {
            Ok(text) => (
                text.trim_end_matches(['\0', ' ', '\n', '\r']).to_string(),
                StlFormat::Binary,
            ),
            Err(_) => (COLORED_HEADER.to_string(), StlFormat::ColoredBinary),
        }
    };

    let declared = read_u32(&bytes[HEADER_SIZE..HEADER_SIZE + 4]);
    let body = &bytes[HEADER_SIZE + 4..];
    let available = body.len() / TRIANGLE_SIZE;
    let count = (declared as usize).min(available);

    let records: Vec<RawTriangle> = body
        .chunks_exact(TRIANGLE_SIZE)
        .take(count)
        .map(|rec| RawTriangle {
            normal: read_vector(&rec[0..12]),
            vertices: [
                Point3::from(read_vector(&rec[12..24])),
                Point3::from(read_vector(&rec[24..36])),
                Point3::from(read_vector(&rec[36..48])),
            ],
        })
        .collect();

    let mut warnings = Vec::new();
    if records.len() != declared as usize {
        warnings.push(LoadWarning::CountMismatch {
            declared,
            decoded: records.len(),
        });
    }

    debug!(
        declared,
        decoded = records.len(),
        colored = format == StlFormat::ColoredBinary,
        "Decoded binary STL"
    );

    Ok(StlDocument {
        header,
        format,
        declared_count: Some(declared),
        records,
        warnings,
    })
}

fn read_u32(buf: &[u8]) -> u32 {
    u32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]])
}

/// Read 3 little-endian f32s.
fn read_vector(buf: &[u8]) -> Vector3<f64> {
    let x = f32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]]);
    let y = f32::from_le_bytes([buf[4], buf[5], buf[6], buf[7]]);
    let z = f32::from_le_bytes([buf[8], buf[9], buf[10], buf[11]]);
    Vector3::new(f64::from(x), f64::from(y), f64::from(z))
}

fn parse_ascii(bytes: &[u8]) -> MeshResult<StlDocument> {
    let text = std::str::from_utf8(bytes)
        .map_err(|e| MeshError::format(format!("ASCII STL is not valid UTF-8: {e}")))?;

    let mut lines = text.lines().enumerate();
    let header = match lines.next() {
        Some((_, line)) => line.trim().to_string(),
        None => return Err(MeshError::format("missing solid line")),
    };

    let mut records = Vec::new();
    let mut normal: Option<Vector3<f64>> = None;
    let mut corners: Vec<Point3<f64>> = Vec::with_capacity(3);
    let mut in_loop = false;
    let mut closed = false;

    for (idx, line) in lines {
        let line_no = idx + 1;
        let mut tokens = line.split_whitespace();
        let Some(keyword) = tokens.next() else {
            continue;
        };

        match keyword.to_ascii_lowercase().as_str() {
            "facet" => {
                if normal.is_some() {
                    return Err(ascii_error(line_no, "facet opened inside another facet"));
                }
                match tokens.next() {
                    Some(word) if word.eq_ignore_ascii_case("normal") => {}
                    _ => return Err(ascii_error(line_no, "expected 'facet normal'")),
                }
                normal = Some(Vector3::from(parse_triple(tokens, line_no)?));
                corners.clear();
            }
            "outer" => {
                if normal.is_none() || in_loop {
                    return Err(ascii_error(line_no, "'outer loop' outside a facet"));
                }
                in_loop = true;
            }
            "vertex" => {
                if !in_loop {
                    return Err(ascii_error(line_no, "vertex outside a loop"));
                }
                if corners.len() == 3 {
                    return Err(ascii_error(line_no, "more than three vertices in a facet"));
                }
                corners.push(Point3::from(parse_triple(tokens, line_no)?));
            }
            "endloop" => {
                if !in_loop {
                    return Err(ascii_error(line_no, "'endloop' without 'outer loop'"));
                }
                in_loop = false;
            }
            "endfacet" => {
                let Some(n) = normal.take() else {
                    return Err(ascii_error(line_no, "'endfacet' without 'facet'"));
                };
                let [v0, v1, v2] = corners[..] else {
                    return Err(ascii_error(
                        line_no,
                        &format!("facet has {} vertices, expected 3", corners.len()),
                    ));
                };
                records.push(RawTriangle {
                    normal: n,
                    vertices: [v0, v1, v2],
                });
                corners.clear();
            }
            "endsolid" => {
                closed = true;
                break;
            }
            other => {
                return Err(ascii_error(line_no, &format!("unexpected keyword '{other}'")));
            }
        }
    }

    if normal.is_some() {
        return Err(MeshError::format("ASCII STL ends inside a facet"));
    }
    if !closed {
        debug!("ASCII STL has no endsolid line");
    }

    Ok(StlDocument {
        header,
        format: StlFormat::Ascii,
        declared_count: None,
        records,
        warnings: Vec::new(),
    })
}

fn parse_triple<'a>(
    mut tokens: impl Iterator<Item = &'a str>,
    line_no: usize,
) -> MeshResult<[f64; 3]> {
    let mut out = [0.0; 3];
    for slot in &mut out {
        let token = tokens
            .next()
            .ok_or_else(|| ascii_error(line_no, "expected three coordinates"))?;
        *slot = token
            .parse()
            .map_err(|_| ascii_error(line_no, &format!("invalid number '{token}'")))?;
    }
    Ok(out)
}

fn ascii_error(line_no: usize, message: &str) -> MeshError {
    MeshError::format(format!("line {line_no}: {message}"))
}

/// Save a mesh to an STL file.
pub fn write_stl<P: AsRef<Path>>(mesh: &Mesh, path: P, encoding: StlEncoding) -> MeshResult<()> {
    let path = path.as_ref();
    let file = File::create(path).map_err(|e| MeshError::IoWrite {
        path: path.to_path_buf(),
        source: e,
    })?;
    let mut writer = BufWriter::new(file);

    write_stl_to(mesh, &mut writer, encoding)
        .and_then(|()| writer.flush())
        .map_err(|e| MeshError::IoWrite {
            path: path.to_path_buf(),
            source: e,
        })?;

    info!(
        "Saved {} triangles to {:?} ({:?})",
        mesh.triangle_count(),
        path,
        encoding
    );
    Ok(())
}

/// Serialize a mesh as STL into any writer.
///
/// Uses current vertex positions and current unit normals.
pub fn write_stl_to<W: Write>(
    mesh: &Mesh,
    writer: &mut W,
    encoding: StlEncoding,
) -> std::io::Result<()> {
    match encoding {
        StlEncoding::Binary => write_binary(mesh, writer),
        StlEncoding::Ascii => write_ascii(mesh, writer),
    }
}

fn write_binary<W: Write>(mesh: &Mesh, writer: &mut W) -> std::io::Result<()> {
    let triangles: Vec<stl_io::Triangle> = mesh
        .triangles()
        .iter()
        .map(|t| {
            let [v0, v1, v2] = mesh_corners(mesh, t);
            let n = t.unit_normal;
            stl_io::Triangle {
                normal: stl_io::Normal::new([n.x as f32, n.y as f32, n.z as f32]),
                vertices: [
                    stl_io::Vertex::new([v0.x as f32, v0.y as f32, v0.z as f32]),
                    stl_io::Vertex::new([v1.x as f32, v1.y as f32, v1.z as f32]),
                    stl_io::Vertex::new([v2.x as f32, v2.y as f32, v2.z as f32]),
                ],
            }
        })
        .collect();

    stl_io::write_stl(writer, triangles.iter())
}

fn write_ascii<W: Write>(mesh: &Mesh, writer: &mut W) -> std::io::Result<()> {
    let name = solid_name(mesh.header());
    writeln!(writer, "solid {name}")?;

    for t in mesh.triangles() {
        let [v0, v1, v2] = mesh_corners(mesh, t);
        let n = t.unit_normal;
        writeln!(writer, "  facet normal {:e} {:e} {:e}", n.x, n.y, n.z)?;
        writeln!(writer, "    outer loop")?;
        for v in [v0, v1, v2] {
            writeln!(writer, "      vertex {:e} {:e} {:e}", v.x, v.y, v.z)?;
        }
        writeln!(writer, "    endloop")?;
        writeln!(writer, "  endfacet")?;
    }

    writeln!(writer, "endsolid {name}")?;
    Ok(())
}

fn mesh_corners(mesh: &Mesh, t: &Triangle) -> [Point3<f64>; 3] {
    let table = mesh.vertices();
    [
        table.position(t.vertices[0]),
        table.position(t.vertices[1]),
        table.position(t.vertices[2]),
    ]
}

/// Solid name for ASCII output, taken from the header when it has one.
fn solid_name(header: &str) -> &str {
    let trimmed = header.trim();
    let name = match trimmed.get(..5) {
        Some(prefix) if prefix.eq_ignore_ascii_case("solid") => trimmed[5..].trim(),
        _ => trimmed,
    };
    let name = name.lines().next().unwrap_or("").trim();
    if name.is_empty() {
        "mesh"
    } else {
        name
    }
}

/// Load a mesh from an STL file.
pub fn load_mesh<P: AsRef<Path>>(path: P, options: &LoadOptions) -> MeshResult<Mesh> {
    Mesh::load(path, options)
}

/// Save a mesh to an STL file.
pub fn save_mesh<P: AsRef<Path>>(mesh: &Mesh, path: P, encoding: StlEncoding) -> MeshResult<()> {
    write_stl(mesh, path, encoding)
}
