use crate::error::{BuckGenericError, BuckResult};
use data_encoding::BASE32_NOPAD;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt::{self, Debug, Display, Formatter};
use std::str::FromStr;

pub const DIGEST_SIZE: usize = 32;

// multiformat tags carried in the binary representation
const MH_SHA2_256: u8 = 0x12;
const CODEC_DAG: u8 = 0x70;
const CID_V1: u8 = 0x01;

/// version of the content id wire/string format; v1 unless a remote root
/// tells us otherwise
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub enum CidVersion {
    V0,
    #[default]
    V1,
}

impl CidVersion {
    pub fn from_number(n: u64) -> BuckResult<Self> {
        match n {
            0 => Ok(CidVersion::V0),
            1 => Ok(CidVersion::V1),
            _ => Err(anyhow!("unknown cid version `{}`", n)),
        }
    }

    pub fn number(self) -> u64 {
        match self {
            CidVersion::V0 => 0,
            CidVersion::V1 => 1,
        }
    }
}

/// a content identifier: a sha-256 digest plus the version of its string
/// encoding. The all-zero digest stands for "no cid" (same trick the zero
/// hash plays in git implementations).
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Cid {
    version: CidVersion,
    digest: [u8; DIGEST_SIZE],
}

impl Cid {
    pub const UNKNOWN: Self = Self { version: CidVersion::V1, digest: [0; DIGEST_SIZE] };

    #[inline]
    pub fn new(version: CidVersion, digest: [u8; DIGEST_SIZE]) -> Self {
        Self { version, digest }
    }

    #[inline]
    pub fn version(self) -> CidVersion {
        self.version
    }

    #[inline]
    pub fn digest(&self) -> &[u8; DIGEST_SIZE] {
        &self.digest
    }

    #[inline]
    pub fn is_defined(self) -> bool {
        self.digest != [0; DIGEST_SIZE]
    }

    /// binary form: v0 is the bare multihash, v1 prefixes version and codec
    pub fn to_bytes(self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(DIGEST_SIZE + 4);
        if self.version == CidVersion::V1 {
            bytes.push(CID_V1);
            bytes.push(CODEC_DAG);
        }
        bytes.push(MH_SHA2_256);
        bytes.push(DIGEST_SIZE as u8);
        bytes.extend_from_slice(&self.digest);
        bytes
    }
}

impl FromStr for Cid {
    type Err = BuckGenericError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        ensure!(!s.is_empty(), "empty cid string");
        let (version, bytes) = if let Some(rest) = s.strip_prefix('b') {
            let decoded = BASE32_NOPAD
                .decode(rest.to_ascii_uppercase().as_bytes())
                .map_err(|err| anyhow!("invalid base32 cid `{}`: {}", s, err))?;
            ensure!(
                decoded.len() == DIGEST_SIZE + 4 && decoded[0] == CID_V1 && decoded[1] == CODEC_DAG,
                "malformed cidv1 `{}`",
                s
            );
            (CidVersion::V1, decoded[2..].to_vec())
        } else {
            (CidVersion::V0, base58_decode(s)?)
        };
        ensure!(
            bytes.len() == DIGEST_SIZE + 2 && bytes[0] == MH_SHA2_256 && bytes[1] == DIGEST_SIZE as u8,
            "malformed multihash in cid `{}`",
            s
        );
        let mut digest = [0; DIGEST_SIZE];
        digest.copy_from_slice(&bytes[2..]);
        Ok(Self { version, digest })
    }
}

impl Display for Cid {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let s = match self.version {
            CidVersion::V0 => base58_encode(&self.to_bytes()),
            CidVersion::V1 => {
                let mut s = String::from("b");
                s.push_str(&BASE32_NOPAD.encode(&self.to_bytes()).to_ascii_lowercase());
                s
            }
        };
        if f.alternate() { write!(f, "{}", &s[..9]) } else { write!(f, "{}", s) }
    }
}

impl Debug for Cid {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self)
    }
}

impl Serialize for Cid {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Cid {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(D::Error::custom)
    }
}

const BASE58_ALPHABET: &[u8; 58] = b"123456789ABCDEFGHJKLMNPQRSTUVWXYZabcdefghijkmnopqrstuvwxyz";

// bitcoin-flavored base58; small enough that hand-rolling beats pulling in a
// crate nothing else needs
fn base58_encode(bytes: &[u8]) -> String {
    let mut digits: Vec<u8> = Vec::with_capacity(bytes.len() * 138 / 100 + 1);
    for &byte in bytes {
        let mut carry = byte as u32;
        for digit in digits.iter_mut() {
            carry += (*digit as u32) << 8;
            *digit = (carry % 58) as u8;
            carry /= 58;
        }
        while carry > 0 {
            digits.push((carry % 58) as u8);
            carry /= 58;
        }
    }
    let zeros = bytes.iter().take_while(|&&b| b == 0).count();
    let mut s = String::with_capacity(zeros + digits.len());
    s.extend(std::iter::repeat('1').take(zeros));
    s.extend(digits.iter().rev().map(|&d| BASE58_ALPHABET[d as usize] as char));
    s
}

fn base58_decode(s: &str) -> BuckResult<Vec<u8>> {
    let mut bytes: Vec<u8> = Vec::with_capacity(s.len());
    for c in s.bytes() {
        let val = BASE58_ALPHABET
            .iter()
            .position(|&a| a == c)
            .ok_or_else(|| anyhow!("invalid base58 character `{}`", c as char))? as u32;
        let mut carry = val;
        for byte in bytes.iter_mut() {
            carry += (*byte as u32) * 58;
            *byte = (carry & 0xff) as u8;
            carry >>= 8;
        }
        while carry > 0 {
            bytes.push((carry & 0xff) as u8);
            carry >>= 8;
        }
    }
    let zeros = s.bytes().take_while(|&b| b == b'1').count();
    let mut out = vec![0u8; zeros];
    out.extend(bytes.iter().rev());
    Ok(out)
}
