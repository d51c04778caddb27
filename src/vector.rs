//! Key-carrying vector payload.
//!
//! Applications usually need to know *which* vector came back from a search,
//! not just its coordinates. [`KeyVec`] pairs a `u32` application key with a
//! dense vector; distances ignore the key via [`ContraMap`].

use crate::codec::Wire;
use crate::error::{Error, Result};
use crate::surface::{ContraMap, Surface};

/// Dense f32 vector annotated with an application key.
#[derive(Debug, Clone, PartialEq)]
pub struct KeyVec {
    pub key: u32,
    pub vec: Vec<f32>,
}

impl KeyVec {
    pub fn new(key: u32, vec: Vec<f32>) -> Self {
        Self { key, vec }
    }

    /// Lifts a surface on raw vectors to a surface on keyed vectors.
    pub fn surface<S>(surface: S) -> impl Surface<KeyVec>
    where
        S: Surface<Vec<f32>>,
    {
        ContraMap {
            surface,
            project: (|v: &KeyVec| &v.vec) as fn(&KeyVec) -> &Vec<f32>,
        }
    }
}

impl Wire for Vec<f32> {
    fn encode(&self, buf: &mut Vec<u8>) {
        buf.extend_from_slice(&(self.len() as u32).to_le_bytes());
        for x in self {
            buf.extend_from_slice(&x.to_le_bytes());
        }
    }

    fn decode(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < 4 {
            return Err(Error::Codec("vector record truncated".into()));
        }
        let n = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as usize;
        let body = &bytes[4..];
        if body.len() != n * 4 {
            return Err(Error::Codec(format!(
                "vector length disagreement: header says {n}, payload holds {}",
                body.len() / 4
            )));
        }
        Ok(body
            .chunks_exact(4)
            .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect())
    }
}

impl Wire for KeyVec {
    fn encode(&self, buf: &mut Vec<u8>) {
        buf.extend_from_slice(&self.key.to_le_bytes());
        self.vec.encode(buf);
    }

    fn decode(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < 4 {
            return Err(Error::Codec("keyed vector record truncated".into()));
        }
        let key = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
        let vec = Vec::<f32>::decode(&bytes[4..])?;
        Ok(Self { key, vec })
    }
}
