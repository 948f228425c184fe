//! Password hashing and session token generation.

use anyhow::{bail, Result};
use rand::Rng;
use rand_distr::Alphanumeric;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Debug)]
pub struct AuthTokenValue(pub String);

impl AuthTokenValue {
    pub fn generate() -> AuthTokenValue {
        let rng = rand::rng();
        let random_string: String = rng
            .sample_iter(&Alphanumeric)
            .take(64)
            .map(char::from)
            .collect();
        AuthTokenValue(random_string)
    }
}

#[derive(Clone, Serialize, Deserialize, Debug)]
pub struct AuthToken {
    pub user_id: i64,
    pub created: i64,
    pub last_used: Option<i64>,
    pub value: AuthTokenValue,
}

mod vinyl_argon2 {
    use anyhow::{anyhow, Result};
    use argon2::{
        password_hash::{
            rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString,
        },
        Argon2,
    };

    pub fn generate_b64_salt() -> String {
        SaltString::generate(&mut OsRng).to_string()
    }

    pub fn hash<T: AsRef<str>>(plain: &[u8], b64_salt: T) -> Result<String> {
        let argon2 = Argon2::default();
        let salt = SaltString::from_b64(b64_salt.as_ref()).map_err(|err| anyhow!("{}", err))?;
        let hash_string = argon2
            .hash_password(plain, &salt)
            .map_err(|err| anyhow!("{}", err))?
            .to_string();
        Ok(hash_string)
    }

    pub fn verify<T: AsRef<str>>(plain_pw: &[u8], target_hash: T) -> Result<bool> {
        let argon2 = Argon2::default();
        let password_hash =
            PasswordHash::new(target_hash.as_ref()).map_err(|err| anyhow!("{}", err))?;
        Ok(argon2.verify_password(plain_pw, &password_hash).is_ok())
    }
}

/// Plain salted sha256, orders of magnitude faster than argon2. Compiled in
/// only for the e2e suite, which registers many users per test run.
#[cfg(feature = "test-fast-hasher")]
mod fast_sha256 {
    use sha2::{Digest, Sha256};

    pub fn hash(plain: &[u8], b64_salt: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(b64_salt.as_bytes());
        hasher.update(plain);
        format!("{:x}", hasher.finalize())
    }
}

#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Eq)]
pub enum CredentialHasher {
    Argon2,
    #[cfg(feature = "test-fast-hasher")]
    FastSha256,
}

impl CredentialHasher {
    pub fn default_hasher() -> Self {
        #[cfg(feature = "test-fast-hasher")]
        return CredentialHasher::FastSha256;
        #[cfg(not(feature = "test-fast-hasher"))]
        CredentialHasher::Argon2
    }

    pub fn generate_b64_salt(&self) -> String {
        vinyl_argon2::generate_b64_salt()
    }

    pub fn hash<T: AsRef<str>>(&self, plain: &[u8], b64_salt: T) -> Result<String> {
        match self {
            CredentialHasher::Argon2 => vinyl_argon2::hash(plain, b64_salt),
            #[cfg(feature = "test-fast-hasher")]
            CredentialHasher::FastSha256 => Ok(fast_sha256::hash(plain, b64_salt.as_ref())),
        }
    }

    pub fn verify(&self, plain_pw: &str, target_hash: &str, b64_salt: &str) -> Result<bool> {
        match self {
            CredentialHasher::Argon2 => {
                let _ = b64_salt;
                vinyl_argon2::verify(plain_pw.as_bytes(), target_hash)
            }
            #[cfg(feature = "test-fast-hasher")]
            CredentialHasher::FastSha256 => {
                Ok(fast_sha256::hash(plain_pw.as_bytes(), b64_salt) == target_hash)
            }
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CredentialHasher::Argon2 => "argon2",
            #[cfg(feature = "test-fast-hasher")]
            CredentialHasher::FastSha256 => "fast_sha256",
        }
    }
}

impl FromStr for CredentialHasher {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "argon2" => Ok(CredentialHasher::Argon2),
            #[cfg(feature = "test-fast-hasher")]
            "fast_sha256" => Ok(CredentialHasher::FastSha256),
            _ => bail!("Unknown hasher {}", s),
        }
    }
}

#[derive(Clone, Serialize, Deserialize, Debug)]
pub struct PasswordCredentials {
    pub user_id: i64,
    pub salt: String,
    pub hash: String,
    pub hasher: CredentialHasher,
    pub created: i64,
}

impl PasswordCredentials {
    pub fn from_plain(user_id: i64, password: &str) -> Result<PasswordCredentials> {
        let hasher = CredentialHasher::default_hasher();
        let salt = hasher.generate_b64_salt();
        let hash = hasher.hash(password.as_bytes(), &salt)?;
        Ok(PasswordCredentials {
            user_id,
            salt,
            hash,
            hasher,
            created: 0,
        })
    }

    pub fn verify(&self, password: &str) -> Result<bool> {
        self.hasher.verify(password, &self.hash, &self.salt)
    }
}
