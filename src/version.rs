/// Totally ordered protocol version tag. Ordering gates behavior: explicit
/// IVs for CBC start at TLS 1.1, and the padding-check strictness differs
/// between SSL 3.0 and TLS (see [`crate::cipher_box::remove_padding`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ProtocolVersion {
    Ssl3_0,
    Tls1_0,
    Tls1_1,
    Tls1_2,
}

impl ProtocolVersion {
    /// CBC record IVs became explicit (sent on the wire) starting in TLS 1.1.
    pub fn has_explicit_block_iv(self) -> bool {
        self >= ProtocolVersion::Tls1_1
    }

    pub fn wire_major_minor(self) -> (u8, u8) {
        match self {
            ProtocolVersion::Ssl3_0 => (3, 0),
            ProtocolVersion::Tls1_0 => (3, 1),
            ProtocolVersion::Tls1_1 => (3, 2),
            ProtocolVersion::Tls1_2 => (3, 3),
        }
    }
}
