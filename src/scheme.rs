//! Key-holding front end: evaluate, decode, decrypt and add.

use crate::algebra::CipherAlgebra;
use crate::cipher::Cipher;
use crate::circuit::{evaluate_batch_with, evaluate_with};
use crate::decoder::{ResidueDecoder, SyndromeDecoder};
use crate::error::Result;
use crate::field::FieldElement;
use crate::keys::{PublicKey, SecretKey};
use crate::prf::{BaseDerivation, ChaChaPrf};

/// Borrowed key pair plus the base derivation and decoder used with it.
pub struct Scheme<'k, D = ChaChaPrf, R = SyndromeDecoder> {
    pk: &'k PublicKey,
    sk: &'k SecretKey,
    derivation: D,
    decoder: R,
}

impl<'k> Scheme<'k> {
    /// Default derivation and decoder. The public key is validated once here.
    ///
    /// # Errors
    /// [`crate::CipherError::InvalidKey`] if `pk` is malformed.
    pub fn new(pk: &'k PublicKey, sk: &'k SecretKey) -> Result<Self> {
        Self::with_parts(pk, sk, ChaChaPrf, SyndromeDecoder)
    }
}

impl<'k, D: BaseDerivation, R: ResidueDecoder> Scheme<'k, D, R> {
    /// # Errors
    /// [`crate::CipherError::InvalidKey`] if `pk` is malformed.
    pub fn with_parts(pk: &'k PublicKey, sk: &'k SecretKey, derivation: D, decoder: R) -> Result<Self> {
        pk.validate()?;
        Ok(Self {
            pk,
            sk,
            derivation,
            decoder,
        })
    }

    #[must_use]
    pub fn public_key(&self) -> &'k PublicKey {
        self.pk
    }

    #[must_use]
    pub fn secret_key(&self) -> &'k SecretKey {
        self.sk
    }

    /// # Errors
    /// [`crate::CipherError::CorruptCipher`] on a malformed circuit.
    pub fn evaluate(&self, c: &Cipher) -> Result<FieldElement> {
        evaluate_with(&self.derivation, c, self.sk, self.pk)
    }

    #[must_use]
    pub fn evaluate_batch(&self, cts: &[Cipher]) -> Vec<Result<FieldElement>> {
        evaluate_batch_with(&self.derivation, cts, self.sk, self.pk)
    }

    /// # Errors
    /// [`crate::CipherError::DecodeFailure`] when no residue is within tolerance.
    pub fn decode(&self, value: FieldElement) -> Result<u32> {
        self.decoder.decode(self.pk, self.sk, value)
    }

    /// Evaluate, then decode.
    ///
    /// # Errors
    /// Either step's error.
    pub fn decrypt(&self, c: &Cipher) -> Result<u32> {
        self.decode(self.evaluate(c)?)
    }

    #[must_use]
    pub fn add(&self, a: &Cipher, b: &Cipher) -> Cipher {
        CipherAlgebra::new(self.pk).add(a, b)
    }

    #[must_use]
    pub fn add_all(&self, cts: &[Cipher]) -> Cipher {
        CipherAlgebra::new(self.pk).sum(cts)
    }
}
