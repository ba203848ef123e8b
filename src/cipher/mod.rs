//! The Blowfish-family block cipher.
//!
//! | Module | Contents |
//! |---|---|
//! | [`constants`] | Canonical subkeys and S-box seed tables |
//! | [`feistel`] | The shared, copy-on-write S-box matrix and round function |
//! | [`blowfish`] | Full and reduced-width block encryption |
//! | [`bcrypt`] | Password/salt key schedule |
//!
//! Not constant-time; this crate's cipher is for the table and network
//! components below it, not as a general-purpose security primitive.

mod bcrypt;
mod blowfish;
mod constants;
mod feistel;

pub use bcrypt::bcrypt;
pub use blowfish::BlowFish;
pub use feistel::{FeistelBox, Matrix};

impl BlowFish {
    /// A cipher derived from a password and salt via the key schedule.
    pub fn from_bcrypt(password: &[u8], salt: &[u8], cost: u32) -> Self {
        bcrypt(password, salt, cost)
    }

    /// A cipher derived from a [`crate::config::CipherConfig`], for
    /// table-at-rest encryption where there's no peer to hand-shake with.
    pub fn from_cipher_config(config: &crate::config::CipherConfig) -> Self {
        bcrypt(&config.password, &config.salt, config.cost)
    }

    /// A cipher that shares its S-boxes with `self` rather than copying
    /// them; cheap to construct, safe as long as neither side mutates its
    /// boxes without detaching first.
    pub fn clone_shared(&self) -> Self {
        self.clone()
    }

    /// A cipher with its own, independent copy of the S-boxes.
    pub fn clone_detached(&self) -> Self {
        let mut c = self.clone();
        c.detach();
        c
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bcrypt_cipher_is_usable() {
        let c = BlowFish::from_bcrypt(b"password", b"saltsalt", 1);
        let mut buf = *b"0123456789abcdef";
        let orig = buf;
        c.encrypt(&mut buf);
        c.decrypt(&mut buf);
        assert_eq!(buf, orig);
    }

    #[test]
    fn clone_detached_is_independent() {
        let a = BlowFish::canonical();
        let mut b = a.clone_detached();
        b.detach();
        assert!(a.state_eq(&BlowFish::canonical()));
    }
}
