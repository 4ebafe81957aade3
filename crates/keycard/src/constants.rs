//! Protocol constants: AID, class bytes, instructions, parameters, TLV tags

/// AID of the Keycard applet instance
pub const KEYCARD_AID: &[u8] = &[0xA0, 0x00, 0x00, 0x08, 0x04, 0x00, 0x01, 0x01, 0x01];

/// ISO class byte, used by SELECT and the unauthenticated command set
pub const CLA_ISO7816: u8 = 0x00;
/// Proprietary class byte, used by every other command
pub const CLA_PROPRIETARY: u8 = 0x80;

/// Instruction bytes
pub mod ins {
    /// ISO SELECT
    pub const SELECT: u8 = 0xA4;
    /// ISO GET RESPONSE (issued by the exchange layer on `61 XX`)
    pub const GET_RESPONSE: u8 = 0xC0;

    pub const INIT: u8 = 0xFD;
    pub const PAIR: u8 = 0x12;
    pub const UNPAIR: u8 = 0x13;
    pub const OPEN_SECURE_CHANNEL: u8 = 0x10;
    pub const MUTUALLY_AUTHENTICATE: u8 = 0x11;
    pub const IDENT: u8 = 0x14;
    pub const GET_STATUS: u8 = 0xF2;
    pub const VERIFY_PIN: u8 = 0x20;
    pub const CHANGE_PIN: u8 = 0x21;
    pub const UNBLOCK_PIN: u8 = 0x22;
    pub const LOAD_KEY: u8 = 0xD4;
    pub const DERIVE_KEY: u8 = 0xD5;
    pub const GENERATE_MNEMONIC: u8 = 0xD6;
    pub const GENERATE_KEY: u8 = 0xD7;
    pub const REMOVE_KEY: u8 = 0xC0;
    pub const SIGN: u8 = 0xC8;
    pub const SET_PINLESS_PATH: u8 = 0xC9;
    pub const EXPORT_KEY: u8 = 0xC2;
    pub const STORE_DATA: u8 = 0xE2;
    pub const GET_DATA: u8 = 0xCA;
    pub const FACTORY_RESET: u8 = 0xFE;
}

/// P1/P2 parameter values
pub mod params {
    /// PAIR: first stage (client challenge)
    pub const P1_PAIR_FIRST_STEP: u8 = 0x00;
    /// PAIR: final stage (client cryptogram)
    pub const P1_PAIR_FINAL_STEP: u8 = 0x01;

    /// GET STATUS: application status template
    pub const P1_GET_STATUS_APPLICATION: u8 = 0x00;
    /// GET STATUS: current key path
    pub const P1_GET_STATUS_KEY_PATH: u8 = 0x01;

    /// CHANGE PIN: user PIN
    pub const P1_CHANGE_PIN: u8 = 0x00;
    /// CHANGE PIN: PUK
    pub const P1_CHANGE_PUK: u8 = 0x01;
    /// CHANGE PIN: pairing secret
    pub const P1_CHANGE_PAIRING_SECRET: u8 = 0x02;

    /// LOAD KEY: BIP39 seed variant
    pub const P1_LOAD_KEY_SEED: u8 = 0x03;

    /// Derivation start point: master key
    pub const P1_DERIVE_FROM_MASTER: u8 = 0x00;
    /// Derivation start point: parent of the current key
    pub const P1_DERIVE_FROM_PARENT: u8 = 0x40;
    /// Derivation start point: current key
    pub const P1_DERIVE_FROM_CURRENT: u8 = 0x80;

    /// SIGN: use the current key
    pub const P1_SIGN_CURRENT: u8 = 0x00;
    /// SIGN: derive (temporary) then sign
    pub const P1_SIGN_DERIVE: u8 = 0x01;
    /// SIGN: derive, make current, then sign
    pub const P1_SIGN_DERIVE_AND_MAKE_CURRENT: u8 = 0x02;
    /// SIGN: use the pinless path
    pub const P1_SIGN_PINLESS: u8 = 0x03;
    /// SIGN: P2 is always 1 (ECDSA over a precomputed hash)
    pub const P2_SIGN_ECDSA: u8 = 0x01;

    /// EXPORT KEY: current key
    pub const P1_EXPORT_KEY_CURRENT: u8 = 0x00;
    /// EXPORT KEY: derive (temporary) then export
    pub const P1_EXPORT_KEY_DERIVE: u8 = 0x01;
    /// EXPORT KEY: derive, make current, then export
    pub const P1_EXPORT_KEY_DERIVE_AND_MAKE_CURRENT: u8 = 0x02;

    /// FACTORY RESET magic parameter
    pub const P1_FACTORY_RESET_MAGIC: u8 = 0xAA;
    /// FACTORY RESET magic parameter
    pub const P2_FACTORY_RESET_MAGIC: u8 = 0xAA;
}

/// TLV tags used by the applet's response payloads
pub mod tags {
    /// Signature template: ECC public key + ECDSA signature
    pub const TEMPLATE_SIGNATURE: u8 = 0xA0;
    /// Keypair template: private key + optional public key / chain code
    pub const TEMPLATE_KEYPAIR: u8 = 0xA1;
    /// Application status template
    pub const TEMPLATE_APPLICATION_STATUS: u8 = 0xA3;
    /// Application info template
    pub const TEMPLATE_APPLICATION_INFO: u8 = 0xA4;

    /// Instance UID (16 bytes)
    pub const INSTANCE_UID: u8 = 0x8F;
    /// Uncompressed ECC public key (65 bytes, or empty when absent)
    pub const ECC_PUBLIC_KEY: u8 = 0x80;
    /// ECC private key (32 bytes)
    pub const ECC_PRIVATE_KEY: u8 = 0x81;
    /// BIP32 chain code (32 bytes)
    pub const CHAIN_CODE: u8 = 0x82;
    /// Small integers: app version, pairing slots, retry counters, r/s values
    pub const INT: u8 = 0x02;
    /// Key UID (32 bytes, or empty when no key is loaded)
    pub const KEY_UID: u8 = 0x8E;
    /// Capability flags (1 byte)
    pub const CAPABILITIES: u8 = 0x8D;
    /// DER ECDSA signature inside the signature template
    pub const ECDSA_SIGNATURE: u8 = 0x30;
    /// Key initialized flag (0xFF when a key is loaded)
    pub const KEY_INITIALIZED: u8 = 0x01;
}
