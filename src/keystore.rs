// SPDX-License-Identifier: MIT

//! The bundled demo keystore.
//!
//! The keystore is a PKCS#12 container holding a single self-signed key pair
//! for `localhost`, embedded into the binary and opened with a fixed
//! passphrase. It stands in for real credential management so the demos can
//! run without any setup; nothing about it is configurable, and nothing about
//! it is secure.
//!
//! Regenerate the fixture with:
//!
//! ```bash
//! openssl req -x509 -newkey rsa:2048 -keyout key.pem -out cert.pem \
//!     -days 3650 -nodes -subj "/CN=localhost" \
//!     -addext "subjectAltName=DNS:localhost,IP:127.0.0.1"
//! openssl pkcs12 -export -out fixtures/testkey.p12 -inkey key.pem \
//!     -in cert.pem -passout pass:password -name selfsigned
//! ```

use openssl::pkcs12::Pkcs12;
use openssl::pkey::{PKey, PKeyRef, Private};
use openssl::x509::{X509, X509Ref};

use crate::error::KeystoreError;

/// The fixed passphrase protecting the bundled keystore.
pub const PASSPHRASE: &str = "password";

const BUNDLED: &[u8] = include_bytes!("../fixtures/testkey.p12");

/// A parsed keystore: one certificate and its private key.
pub struct Keystore {
    certificate: X509,
    private_key: PKey<Private>,
}

impl Keystore {
    /// Load the keystore bundled into this binary.
    pub fn bundled() -> Result<Self, KeystoreError> {
        Self::from_der(BUNDLED, PASSPHRASE)
    }

    /// Parse a PKCS#12 container.
    pub fn from_der(der: &[u8], passphrase: &str) -> Result<Self, KeystoreError> {
        let parsed = Pkcs12::from_der(der)?.parse2(passphrase)?;
        let certificate = parsed
            .cert
            .ok_or(KeystoreError::Incomplete("a certificate"))?;
        let private_key = parsed
            .pkey
            .ok_or(KeystoreError::Incomplete("a private key"))?;
        Ok(Self {
            certificate,
            private_key,
        })
    }

    pub fn certificate(&self) -> &X509Ref {
        &self.certificate
    }

    pub fn private_key(&self) -> &PKeyRef<Private> {
        &self.private_key
    }
}
