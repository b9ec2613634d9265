use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

/// The only challenge method accepted.
pub const METHOD_S256: &str = "S256";

/// Computes the S256 code challenge from a code verifier.
///
/// `challenge = BASE64URL(SHA256(verifier))`
#[must_use]
pub fn code_challenge(verifier: &str) -> String {
    let hash = Sha256::digest(verifier.as_bytes());
    URL_SAFE_NO_PAD.encode(hash)
}

/// Whether `verifier` hashes to the stored `challenge`.
#[must_use]
pub fn verify(verifier: &str, challenge: &str) -> bool {
    code_challenge(verifier)
        .as_bytes()
        .ct_eq(challenge.as_bytes())
        .into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_s256_vector() {
        let verifier = "dBjftJeZ4CVP-mJ92K9I4bSIRBIXuvaM1bBiYB0fvcLD";
        let expected = "cUz5BiHUN4v8oSGRppldAZDb7vZcQ_apEzsRHrI67a0";
        assert_eq!(code_challenge(verifier), expected);
        assert!(verify(verifier, expected));
        assert_eq!(code_challenge("verifier_1"), "gjhYPSrLWYOHS7R0D2R8fBuGlNeRKbE614Jfx0Z7aMs");
    }

    #[test]
    fn other_verifier_fails() {
        let challenge = code_challenge("verifier_1");
        assert!(!verify("verifier_2", &challenge));
        assert!(!verify("", &challenge));
    }
}
