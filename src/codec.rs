//! Little-endian, magic-tagged wire format for ciphertexts and keys.
//!
//! | artifact | layout |
//! |---|---|
//! | ciphertext file | magic, version, `u64` count, ciphers |
//! | cipher | `u32` layer count, `u32` edge count, layers, edges |
//! | layer | `u8` tag; base: `ztag`, `nonce.lo`, `nonce.hi` (`u64`); product: `pa`, `pb` (`u32`); other: 24 bytes |
//! | edge | `u32` layer id, `u16` idx, `u8` ch, pad byte, weight, selector |
//! | field element | `u64` lo, `u64` hi |
//! | bit vector | `u32` nbits, `ceil(nbits/64)` `u64` words |
//! | secret key file | magic, version, 4 `u64` PRF key words, `u64` count, words |
//! | public key file | magic, version, params, `canon_tag`, 32-byte digest, H, perm, inv, omega, powers |

use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::Path;

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use tracing::debug;

use crate::bitvec::{word_count, BitVector};
use crate::cipher::{Cipher, Edge, Layer, Nonce};
use crate::error::{Artifact, CipherError, Result};
use crate::field::FieldElement;
use crate::keys::{PublicKey, SchemeParams, SecretKey, Ubk};

/// Magic of a ciphertext file.
pub const MAGIC_CIPHERS: u32 = 0x6669_9666;
/// Magic of a secret key file.
pub const MAGIC_SECRET_KEY: u32 = 0x6666_6999;
/// Magic of a public key file.
pub const MAGIC_PUBLIC_KEY: u32 = 0x0666_0666;
/// Format version shared by all three artifacts.
pub const FORMAT_VERSION: u32 = 1;

/// Upper bound on capacity reserved from an untrusted count.
const MAX_PREALLOC: u64 = 4096;

/// Serialize to a byte stream.
pub trait WriterTo {
    /// Appends the little-endian encoding of `self`.
    fn write_to<W: Write>(&self, writer: &mut W) -> io::Result<()>;
}

/// Deserialize from a byte stream.
pub trait ReaderFrom: Sized {
    /// Reads one value; a short stream is `UnexpectedEof`.
    fn read_from<R: Read>(reader: &mut R) -> io::Result<Self>;
}

impl WriterTo for FieldElement {
    fn write_to<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        writer.write_u64::<LittleEndian>(self.lo)?;
        writer.write_u64::<LittleEndian>(self.hi)
    }
}

impl ReaderFrom for FieldElement {
    fn read_from<R: Read>(reader: &mut R) -> io::Result<Self> {
        let lo = reader.read_u64::<LittleEndian>()?;
        let hi = reader.read_u64::<LittleEndian>()?;
        Ok(FieldElement::from_limbs(lo, hi))
    }
}

impl WriterTo for BitVector {
    fn write_to<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        writer.write_u32::<LittleEndian>(to_u32(self.len(), "bit vector length")?)?;
        for &w in self.words() {
            writer.write_u64::<LittleEndian>(w)?;
        }
        Ok(())
    }
}

impl ReaderFrom for BitVector {
    fn read_from<R: Read>(reader: &mut R) -> io::Result<Self> {
        let nbits = reader.read_u32::<LittleEndian>()? as usize;
        let n = word_count(nbits);
        let mut words = Vec::with_capacity(n.min(MAX_PREALLOC as usize));
        for _ in 0..n {
            words.push(reader.read_u64::<LittleEndian>()?);
        }
        Ok(BitVector::from_words(nbits, words))
    }
}

impl WriterTo for Layer {
    fn write_to<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        // a reserved record under tag 0 or 1 would read back as another rule
        if let Layer::Reserved { tag: tag @ (Layer::TAG_BASE | Layer::TAG_PRODUCT), .. } = self {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("reserved layer carries tag {tag}"),
            ));
        }
        writer.write_u8(self.tag())?;
        match self {
            Layer::Base { ztag, nonce } => {
                writer.write_u64::<LittleEndian>(*ztag)?;
                writer.write_u64::<LittleEndian>(nonce.lo)?;
                writer.write_u64::<LittleEndian>(nonce.hi)
            }
            Layer::Product { pa, pb } => {
                writer.write_u32::<LittleEndian>(*pa)?;
                writer.write_u32::<LittleEndian>(*pb)
            }
            Layer::Reserved { payload, .. } => writer.write_all(payload),
        }
    }
}

impl ReaderFrom for Layer {
    fn read_from<R: Read>(reader: &mut R) -> io::Result<Self> {
        let tag = reader.read_u8()?;
        Ok(match tag {
            Layer::TAG_BASE => Layer::Base {
                ztag: reader.read_u64::<LittleEndian>()?,
                nonce: Nonce {
                    lo: reader.read_u64::<LittleEndian>()?,
                    hi: reader.read_u64::<LittleEndian>()?,
                },
            },
            Layer::TAG_PRODUCT => Layer::Product {
                pa: reader.read_u32::<LittleEndian>()?,
                pb: reader.read_u32::<LittleEndian>()?,
            },
            _ => {
                let mut payload = [0u8; 24];
                reader.read_exact(&mut payload)?;
                Layer::Reserved { tag, payload }
            }
        })
    }
}

impl WriterTo for Edge {
    fn write_to<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        writer.write_u32::<LittleEndian>(self.layer_id)?;
        writer.write_u16::<LittleEndian>(self.idx)?;
        writer.write_u8(self.ch)?;
        writer.write_u8(0)?;
        self.weight.write_to(writer)?;
        self.selector.write_to(writer)
    }
}

impl ReaderFrom for Edge {
    fn read_from<R: Read>(reader: &mut R) -> io::Result<Self> {
        let layer_id = reader.read_u32::<LittleEndian>()?;
        let idx = reader.read_u16::<LittleEndian>()?;
        let ch = reader.read_u8()?;
        let _pad = reader.read_u8()?;
        Ok(Edge {
            layer_id,
            idx,
            ch,
            weight: FieldElement::read_from(reader)?,
            selector: BitVector::read_from(reader)?,
        })
    }
}

impl WriterTo for Cipher {
    fn write_to<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        writer.write_u32::<LittleEndian>(to_u32(self.layers().len(), "layer count")?)?;
        writer.write_u32::<LittleEndian>(to_u32(self.edges().len(), "edge count")?)?;
        for l in self.layers() {
            l.write_to(writer)?;
        }
        for e in self.edges() {
            e.write_to(writer)?;
        }
        Ok(())
    }
}

impl ReaderFrom for Cipher {
    fn read_from<R: Read>(reader: &mut R) -> io::Result<Self> {
        let nl = reader.read_u32::<LittleEndian>()?;
        let ne = reader.read_u32::<LittleEndian>()?;
        let layers = read_n(reader, u64::from(nl), Layer::read_from)?;
        let edges = read_n(reader, u64::from(ne), Edge::read_from)?;
        Ok(Cipher::from_parts_unchecked(layers, edges))
    }
}

impl WriterTo for SecretKey {
    fn write_to<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        for &k in &self.prf_k {
            writer.write_u64::<LittleEndian>(k)?;
        }
        writer.write_u64::<LittleEndian>(self.lpn_s_bits.len() as u64)?;
        for &w in &self.lpn_s_bits {
            writer.write_u64::<LittleEndian>(w)?;
        }
        Ok(())
    }
}

impl ReaderFrom for SecretKey {
    fn read_from<R: Read>(reader: &mut R) -> io::Result<Self> {
        let mut prf_k = [0u64; 4];
        reader.read_u64_into::<LittleEndian>(&mut prf_k)?;
        let n = reader.read_u64::<LittleEndian>()?;
        let lpn_s_bits = read_n(reader, n, |r| r.read_u64::<LittleEndian>())?;
        Ok(SecretKey { prf_k, lpn_s_bits })
    }
}

impl WriterTo for SchemeParams {
    fn write_to<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        for v in [
            self.m_bits,
            self.b,
            self.lpn_t,
            self.lpn_n,
            self.lpn_tau_num,
            self.lpn_tau_den,
            self.noise_entropy_bits,
            self.depth_slope_bits,
        ] {
            writer.write_u32::<LittleEndian>(v)?;
        }
        writer.write_u64::<LittleEndian>(self.tuple2_fraction_bits)?;
        writer.write_u32::<LittleEndian>(self.edge_budget)
    }
}

impl ReaderFrom for SchemeParams {
    fn read_from<R: Read>(reader: &mut R) -> io::Result<Self> {
        let mut head = [0u32; 8];
        reader.read_u32_into::<LittleEndian>(&mut head)?;
        let [m_bits, b, lpn_t, lpn_n, lpn_tau_num, lpn_tau_den, noise_entropy_bits, depth_slope_bits] = head;
        Ok(SchemeParams {
            m_bits,
            b,
            lpn_t,
            lpn_n,
            lpn_tau_num,
            lpn_tau_den,
            noise_entropy_bits,
            depth_slope_bits,
            tuple2_fraction_bits: reader.read_u64::<LittleEndian>()?,
            edge_budget: reader.read_u32::<LittleEndian>()?,
        })
    }
}

impl WriterTo for PublicKey {
    fn write_to<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        self.params.write_to(writer)?;
        writer.write_u64::<LittleEndian>(self.canon_tag)?;
        writer.write_all(&self.h_digest)?;

        writer.write_u64::<LittleEndian>(self.h.len() as u64)?;
        for row in &self.h {
            row.write_to(writer)?;
        }
        for table in [&self.ubk.perm, &self.ubk.inv] {
            writer.write_u64::<LittleEndian>(table.len() as u64)?;
            for &v in table {
                writer.write_u32::<LittleEndian>(v)?;
            }
        }
        self.omega_b.write_to(writer)?;
        writer.write_u64::<LittleEndian>(self.powg_b.len() as u64)?;
        for f in &self.powg_b {
            f.write_to(writer)?;
        }
        Ok(())
    }
}

impl ReaderFrom for PublicKey {
    fn read_from<R: Read>(reader: &mut R) -> io::Result<Self> {
        let params = SchemeParams::read_from(reader)?;
        let canon_tag = reader.read_u64::<LittleEndian>()?;
        let mut h_digest = [0u8; 32];
        reader.read_exact(&mut h_digest)?;

        let n = reader.read_u64::<LittleEndian>()?;
        let h = read_n(reader, n, BitVector::read_from)?;
        let n = reader.read_u64::<LittleEndian>()?;
        let perm = read_n(reader, n, |r| r.read_u32::<LittleEndian>())?;
        let n = reader.read_u64::<LittleEndian>()?;
        let inv = read_n(reader, n, |r| r.read_u32::<LittleEndian>())?;
        let omega_b = FieldElement::read_from(reader)?;
        let n = reader.read_u64::<LittleEndian>()?;
        let powg_b = read_n(reader, n, FieldElement::read_from)?;

        Ok(PublicKey {
            params,
            canon_tag,
            h_digest,
            h,
            ubk: Ubk { perm, inv },
            omega_b,
            powg_b,
        })
    }
}

/// Reads `n` items without trusting `n` for the allocation size.
fn read_n<R: Read, T>(
    reader: &mut R,
    n: u64,
    mut item: impl FnMut(&mut R) -> io::Result<T>,
) -> io::Result<Vec<T>> {
    let mut out = Vec::with_capacity(n.min(MAX_PREALLOC) as usize);
    for _ in 0..n {
        out.push(item(reader)?);
    }
    Ok(out)
}

fn to_u32(n: usize, what: &str) -> io::Result<u32> {
    u32::try_from(n).map_err(|_| {
        io::Error::new(io::ErrorKind::InvalidInput, format!("{what} {n} does not fit in u32"))
    })
}

fn write_header<W: Write>(writer: &mut W, magic: u32) -> io::Result<()> {
    writer.write_u32::<LittleEndian>(magic)?;
    writer.write_u32::<LittleEndian>(FORMAT_VERSION)
}

fn read_header<R: Read>(reader: &mut R, artifact: Artifact, magic: u32) -> Result<()> {
    let found = reader
        .read_u32::<LittleEndian>()
        .map_err(|e| CipherError::from_read(artifact, e))?;
    if found != magic {
        return Err(CipherError::Format {
            artifact,
            detail: format!("magic {found:#010x}, expected {magic:#010x}"),
            path: None,
        });
    }
    let version = reader
        .read_u32::<LittleEndian>()
        .map_err(|e| CipherError::from_read(artifact, e))?;
    if version != FORMAT_VERSION {
        return Err(CipherError::Format {
            artifact,
            detail: format!("version {version}, expected {FORMAT_VERSION}"),
            path: None,
        });
    }
    Ok(())
}

/// Writes a ciphertext file image.
///
/// # Errors
/// Only [`CipherError::Io`] from the sink.
pub fn write_ciphers<W: Write>(writer: &mut W, ciphers: &[Cipher]) -> Result<()> {
    write_header(writer, MAGIC_CIPHERS)?;
    writer.write_u64::<LittleEndian>(ciphers.len() as u64)?;
    for c in ciphers {
        c.write_to(writer)?;
    }
    Ok(())
}

/// Reads a ciphertext file image.
///
/// # Errors
/// [`CipherError::Format`] on a foreign header, [`CipherError::Truncated`] on
/// a short stream.
pub fn read_ciphers<R: Read>(reader: &mut R) -> Result<Vec<Cipher>> {
    read_header(reader, Artifact::Ciphers, MAGIC_CIPHERS)?;
    read_cipher_list(reader).map_err(|e| CipherError::from_read(Artifact::Ciphers, e))
}

fn read_cipher_list<R: Read>(reader: &mut R) -> io::Result<Vec<Cipher>> {
    let n = reader.read_u64::<LittleEndian>()?;
    read_n(reader, n, Cipher::read_from)
}

/// # Errors
/// Only [`CipherError::Io`] from the sink.
pub fn write_secret_key<W: Write>(writer: &mut W, sk: &SecretKey) -> Result<()> {
    write_header(writer, MAGIC_SECRET_KEY)?;
    sk.write_to(writer)?;
    Ok(())
}

/// # Errors
/// [`CipherError::Format`] or [`CipherError::Truncated`].
pub fn read_secret_key<R: Read>(reader: &mut R) -> Result<SecretKey> {
    read_header(reader, Artifact::SecretKey, MAGIC_SECRET_KEY)?;
    SecretKey::read_from(reader).map_err(|e| CipherError::from_read(Artifact::SecretKey, e))
}

/// # Errors
/// Only [`CipherError::Io`] from the sink.
pub fn write_public_key<W: Write>(writer: &mut W, pk: &PublicKey) -> Result<()> {
    write_header(writer, MAGIC_PUBLIC_KEY)?;
    pk.write_to(writer)?;
    Ok(())
}

/// # Errors
/// [`CipherError::Format`] or [`CipherError::Truncated`].
pub fn read_public_key<R: Read>(reader: &mut R) -> Result<PublicKey> {
    read_header(reader, Artifact::PublicKey, MAGIC_PUBLIC_KEY)?;
    PublicKey::read_from(reader).map_err(|e| CipherError::from_read(Artifact::PublicKey, e))
}

/// Loads every cipher stored at `path`.
///
/// # Errors
/// As [`read_ciphers`], with the path attached; [`CipherError::Io`] if the
/// file cannot be opened.
pub fn load_ciphers(path: impl AsRef<Path>) -> Result<Vec<Cipher>> {
    let path = path.as_ref();
    let mut reader = BufReader::new(File::open(path)?);
    let cts = read_ciphers(&mut reader).map_err(|e| e.with_path(path))?;
    debug!(path = %path.display(), count = cts.len(), "loaded ciphers");
    Ok(cts)
}

/// # Errors
/// [`CipherError::Io`] if the file cannot be written.
pub fn save_ciphers(path: impl AsRef<Path>, ciphers: &[Cipher]) -> Result<()> {
    let path = path.as_ref();
    let mut writer = BufWriter::new(File::create(path)?);
    write_ciphers(&mut writer, ciphers)?;
    writer.flush()?;
    debug!(path = %path.display(), count = ciphers.len(), "saved ciphers");
    Ok(())
}

/// # Errors
/// As [`read_secret_key`], with the path attached.
pub fn load_secret_key(path: impl AsRef<Path>) -> Result<SecretKey> {
    let path = path.as_ref();
    let mut reader = BufReader::new(File::open(path)?);
    let sk = read_secret_key(&mut reader).map_err(|e| e.with_path(path))?;
    debug!(path = %path.display(), noise_words = sk.lpn_s_bits.len(), "loaded secret key");
    Ok(sk)
}

/// # Errors
/// [`CipherError::Io`] if the file cannot be written.
pub fn save_secret_key(path: impl AsRef<Path>, sk: &SecretKey) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    write_secret_key(&mut writer, sk)?;
    writer.flush()?;
    Ok(())
}

/// # Errors
/// As [`read_public_key`], with the path attached.
pub fn load_public_key(path: impl AsRef<Path>) -> Result<PublicKey> {
    let path = path.as_ref();
    let mut reader = BufReader::new(File::open(path)?);
    let pk = read_public_key(&mut reader).map_err(|e| e.with_path(path))?;
    debug!(
        path = %path.display(),
        b = pk.params.b,
        rows = pk.h.len(),
        width = pk.row_width(),
        "loaded public key"
    );
    Ok(pk)
}

/// # Errors
/// [`CipherError::Io`] if the file cannot be written.
pub fn save_public_key(path: impl AsRef<Path>, pk: &PublicKey) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    write_public_key(&mut writer, pk)?;
    writer.flush()?;
    Ok(())
}
