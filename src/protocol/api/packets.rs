//! Game API request and response packets.
//!
//! A request body is a payload followed by a trailer of `u32 uid` and the
//! one-byte-length version string. The auth endpoints also need `dl`, the
//! payload length without its leading opcode byte, sent as a header.

use bytes::Bytes;
use chrono::{DateTime, Utc};

use crate::common::error::{ApiError, ApiResult, ProtocolResult};
use crate::common::types::timestamp_from_unix;
use crate::protocol::api::buffer::{PacketReader, PacketWriter, StringLayout};

/// Client build the request format and the AuthResponse layout belong to.
///
/// The opaque block sizes in `AuthResponse` were measured against this
/// build; re-check them whenever this changes.
pub const API_VERSION: &str = "1.7.82.30601";

/// Uid sent by requests made before login.
pub const ANONYMOUS_UID: u32 = 0xffff_ffff;

const AUTH_MAGIC: [u8; 7] = [0x06, 0x00, 0x00, 0x00, 0x01, 0x01, 0x03];

/// A serialized request body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackedRequest {
    pub body: Bytes,
    /// Payload bytes between the opcode and the trailer.
    pub dl: usize,
}

/// Request types that serialize into a body.
pub trait RequestEncode {
    /// Endpoint path, including the service prefix.
    const PATH: &'static str;
    /// Whether the request carries the `x-DL` header.
    const SENDS_DL: bool;

    /// Uid written into the trailer.
    fn uid(&self) -> u32;

    fn version(&self) -> &str;

    /// Write everything before the trailer.
    fn encode_payload(&self, writer: &mut PacketWriter);

    /// Payload plus trailer, with `dl` computed from the sizes.
    fn pack(&self) -> ProtocolResult<PackedRequest> {
        let mut trailer = PacketWriter::new();
        trailer.write_u32(self.uid());
        trailer.write_string(self.version())?;
        let trailer = trailer.finish();

        let mut writer = PacketWriter::new();
        self.encode_payload(&mut writer);
        writer.write_bytes(&trailer);

        let total = writer.len();
        Ok(PackedRequest {
            body: writer.finish(),
            dl: total.saturating_sub(trailer.len() + 1),
        })
    }
}

/// Response types decoded from a body.
pub trait ResponseDecode: Sized {
    fn decode(reader: &mut PacketReader) -> ApiResult<Self>;
}

/// `/InfoService/GetServerTime` request.
#[derive(Debug, Clone)]
pub struct ServerTimeRequest {
    pub version: String,
}

impl RequestEncode for ServerTimeRequest {
    const PATH: &'static str = "/InfoService/GetServerTime";
    const SENDS_DL: bool = false;

    fn uid(&self) -> u32 {
        ANONYMOUS_UID
    }

    fn version(&self) -> &str {
        &self.version
    }

    fn encode_payload(&self, writer: &mut PacketWriter) {
        writer.write_u8(0x00);
    }
}

/// Server clock reading.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerTimeResponse {
    /// Leading bytes of unknown meaning.
    pub unknown: [u8; 3],
    pub time: DateTime<Utc>,
}

impl ResponseDecode for ServerTimeResponse {
    fn decode(reader: &mut PacketReader) -> ApiResult<Self> {
        Ok(Self {
            unknown: reader.read_array()?,
            time: timestamp_from_unix(reader.read_u32()?),
        })
    }
}

/// `/AuthService/AuthRequest` request.
#[derive(Debug, Clone)]
pub struct AuthRequest {
    pub uid: u32,
    pub version: String,
}

impl RequestEncode for AuthRequest {
    const PATH: &'static str = "/AuthService/AuthRequest";
    const SENDS_DL: bool = true;

    fn uid(&self) -> u32 {
        self.uid
    }

    fn version(&self) -> &str {
        &self.version
    }

    fn encode_payload(&self, writer: &mut PacketWriter) {
        writer.write_bytes(&AUTH_MAGIC);
        writer.write_u32(self.uid);
    }
}

/// `/AuthService/AuthChallangeResponse` request. The path spelling is the
/// server's.
#[derive(Debug, Clone)]
pub struct AuthChallengeRequest {
    pub uid: u32,
    pub version: String,
}

impl RequestEncode for AuthChallengeRequest {
    const PATH: &'static str = "/AuthService/AuthChallangeResponse";
    const SENDS_DL: bool = true;

    fn uid(&self) -> u32 {
        self.uid
    }

    fn version(&self) -> &str {
        &self.version
    }

    fn encode_payload(&self, writer: &mut PacketWriter) {
        writer.write_bytes(&AUTH_MAGIC);
    }
}

/// Login reply: service endpoints, localized links and store text.
///
/// Fields appear here in wire order. The `block_*` fields are byte ranges
/// of unknown meaning, kept verbatim.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthResponse {
    pub header: [u8; 6],
    pub block_1: Bytes,
    pub game_server: String,
    pub chat_server: String,
    pub block_2: [u8; 42],
    pub privacy_policy_url: String,
    pub block_3: [u8; 35],
    pub support_url_en: String,
    pub support_url_ru: String,
    pub block_4: [u8; 53],
    pub code_piece_4: String,
    pub block_5: [u8; 28],
    pub support_url_en_alt: String,
    pub support_url_ru_alt: String,
    pub code_piece_1: String,
    pub block_6: [u8; 9],
    pub teletype_url_ru: String,
    pub teletype_url_en: String,
    pub block_7: [u8; 62],
    pub special_offer: String,
    pub block_8: [u8; 30],
    pub claim_en: String,
    pub block_9: [u8; 22],
    pub claim_de: String,
    pub claim_pl: String,
    pub block_10: [u8; 3],
    pub offer_tiers: String,
    pub offer_tier_numbers: String,
    pub code_piece_2: String,
    pub block_11: [u8; 123],
    pub google_play_shop: String,
    pub block_12: [u8; 30],
    pub official_shop: String,
    pub block_13: [u8; 10],
    pub teletype_url_en_alt_1: String,
    pub teletype_url_en_alt_2: String,
    pub block_14: [u8; 4],
    pub code_piece_3: String,
    pub block_15: [u8; 8],
    pub settings: serde_json::Value,
}

impl ResponseDecode for AuthResponse {
    fn decode(r: &mut PacketReader) -> ApiResult<Self> {
        use StringLayout::{A, B, C, D};

        let header = r.read_array()?;
        let block_1_len = usize::from(r.read_u8()?);
        let block_1 = r.read_bytes(block_1_len)?;

        let game_server = r.read_string(A)?;
        let chat_server = r.read_string(A)?;
        let block_2 = r.read_array()?;
        let privacy_policy_url = r.read_string(A)?;
        let block_3 = r.read_array()?;
        let support_url_en = r.read_string(B)?;
        let support_url_ru = r.read_string(B)?;
        let block_4 = r.read_array()?;
        let code_piece_4 = r.read_string(A)?;
        let block_5 = r.read_array()?;
        let support_url_en_alt = r.read_string(C)?;
        let support_url_ru_alt = r.read_string(B)?;
        let code_piece_1 = r.read_string(A)?;
        let block_6 = r.read_array()?;
        let teletype_url_ru = r.read_string(A)?;
        let teletype_url_en = r.read_string(A)?;
        let block_7 = r.read_array()?;
        let special_offer = r.read_string(A)?;
        let block_8 = r.read_array()?;
        let claim_en = r.read_string(A)?;
        let block_9 = r.read_array()?;
        let claim_de = r.read_string(B)?;
        let claim_pl = r.read_string(A)?;
        let block_10 = r.read_array()?;
        let offer_tiers = r.read_string(A)?;
        let offer_tier_numbers = r.read_string(B)?;
        let code_piece_2 = r.read_string(A)?;
        let block_11 = r.read_array()?;
        let google_play_shop = r.read_string(B)?;
        let block_12 = r.read_array()?;
        let official_shop = r.read_string(A)?;
        let block_13 = r.read_array()?;
        let teletype_url_en_alt_1 = r.read_string(B)?;
        let teletype_url_en_alt_2 = r.read_string(B)?;
        let block_14 = r.read_array()?;
        let code_piece_3 = r.read_string(A)?;
        let block_15 = r.read_array()?;

        let settings_text = r.read_string(D)?;
        let settings = serde_json::from_str(&settings_text).map_err(|e| {
            ApiError::MalformedResponse {
                message: format!("settings document is not JSON: {}", e),
            }
        })?;

        Ok(Self {
            header,
            block_1,
            game_server,
            chat_server,
            block_2,
            privacy_policy_url,
            block_3,
            support_url_en,
            support_url_ru,
            block_4,
            code_piece_4,
            block_5,
            support_url_en_alt,
            support_url_ru_alt,
            code_piece_1,
            block_6,
            teletype_url_ru,
            teletype_url_en,
            block_7,
            special_offer,
            block_8,
            claim_en,
            block_9,
            claim_de,
            claim_pl,
            block_10,
            offer_tiers,
            offer_tier_numbers,
            code_piece_2,
            block_11,
            google_play_shop,
            block_12,
            official_shop,
            block_13,
            teletype_url_en_alt_1,
            teletype_url_en_alt_2,
            block_14,
            code_piece_3,
            block_15,
            settings,
        })
    }
}

/// Challenge reply. Its contents belong to the unimplemented handshake and
/// are kept whole.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthChallengeResponse {
    pub body: Bytes,
}

impl ResponseDecode for AuthChallengeResponse {
    fn decode(reader: &mut PacketReader) -> ApiResult<Self> {
        let len = reader.remaining();
        Ok(Self {
            body: reader.read_bytes(len)?,
        })
    }
}
