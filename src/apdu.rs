//! APDU frame construction and status words.

use crate::error::EncodingError;
use crate::params::MAX_APDU_PAYLOAD;

/// Status words the app is known to return.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[repr(u16)]
pub enum StatusWord {
    /// Rejected by user
    Deny = 0x6985,
    /// Incorrect Data
    IncorrectData = 0x6A80,
    /// Not Supported
    NotSupported = 0x6A82,
    /// Wrong P1P2
    WrongP1P2 = 0x6A86,
    /// Wrong DataLength
    WrongDataLength = 0x6A87,
    /// Ins not supported
    InsNotSupported = 0x6D00,
    /// Cla not supported
    ClaNotSupported = 0x6E00,
    /// Device is locked
    DeviceLocked = 0x5515,
    /// Success
    OK = 0x9000,
}

impl TryFrom<u16> for StatusWord {
    type Error = ();

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        match value {
            0x6985 => Ok(StatusWord::Deny),
            0x6A80 => Ok(StatusWord::IncorrectData),
            0x6A82 => Ok(StatusWord::NotSupported),
            0x6A86 => Ok(StatusWord::WrongP1P2),
            0x6A87 => Ok(StatusWord::WrongDataLength),
            0x6D00 => Ok(StatusWord::InsNotSupported),
            0x6E00 => Ok(StatusWord::ClaNotSupported),
            0x5515 => Ok(StatusWord::DeviceLocked),
            0x9000 => Ok(StatusWord::OK),
            _ => Err(()),
        }
    }
}

impl core::fmt::Display for StatusWord {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        let s = match self {
            StatusWord::Deny => "rejected by user",
            StatusWord::IncorrectData => "incorrect data",
            StatusWord::NotSupported => "not supported",
            StatusWord::WrongP1P2 => "wrong p1/p2",
            StatusWord::WrongDataLength => "wrong data length",
            StatusWord::InsNotSupported => "instruction not supported",
            StatusWord::ClaNotSupported => "class byte not supported",
            StatusWord::DeviceLocked => "device locked",
            StatusWord::OK => "ok",
        };
        f.write_str(s)
    }
}

/// One APDU frame: class byte, instruction, two parameter bytes, payload.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct APDUCommand {
    pub cla: u8,
    pub ins: u8,
    pub p1: u8,
    pub p2: u8,
    data: Vec<u8>,
}

impl APDUCommand {
    /// Composes a transport-ready frame.
    ///
    /// Fails with [`EncodingError::FrameTooLarge`] if the payload exceeds
    /// [`MAX_APDU_PAYLOAD`]; callers with larger payloads must split them
    /// with [`crate::chunk::chunks`] first.
    pub fn new(
        cla: u8,
        ins: u8,
        p1: u8,
        p2: u8,
        data: Vec<u8>,
    ) -> Result<Self, EncodingError> {
        if data.len() > MAX_APDU_PAYLOAD {
            return Err(EncodingError::FrameTooLarge(data.len()));
        }
        Ok(Self {
            cla,
            ins,
            p1,
            p2,
            data,
        })
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Serializes the frame as `cla ins p1 p2 len data`.
    ///
    /// The payload length fits one byte by construction.
    pub fn encode(&self) -> Vec<u8> {
        let mut vec = vec![self.cla, self.ins, self.p1, self.p2, self.data.len() as u8];
        vec.extend(self.data.iter());
        vec
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_prepends_header_and_length() {
        let cmd = APDUCommand::new(0x80, 0x02, 0x00, 0x00, vec![0xAA, 0xBB]).unwrap();
        assert_eq!(cmd.encode(), vec![0x80, 0x02, 0x00, 0x00, 0x02, 0xAA, 0xBB]);
    }

    #[test]
    fn encode_empty_payload() {
        let cmd = APDUCommand::new(0x80, 0x00, 0x00, 0x00, vec![]).unwrap();
        assert_eq!(cmd.encode(), vec![0x80, 0x00, 0x00, 0x00, 0x00]);
    }

    #[test]
    fn oversized_payload_is_a_frame_error() {
        let err = APDUCommand::new(0x80, 0x05, 0x01, 0x00, vec![0; MAX_APDU_PAYLOAD + 1])
            .unwrap_err();
        assert_eq!(err, EncodingError::FrameTooLarge(MAX_APDU_PAYLOAD + 1));
    }

    #[test]
    fn payload_at_the_limit_is_accepted() {
        assert!(APDUCommand::new(0x80, 0x05, 0x01, 0x00, vec![0; MAX_APDU_PAYLOAD]).is_ok());
    }

    #[test]
    fn status_word_round_trip() {
        for sw in [0x6985u16, 0x6A80, 0x6A82, 0x6A86, 0x6A87, 0x6D00, 0x6E00, 0x5515, 0x9000] {
            assert_eq!(StatusWord::try_from(sw).unwrap() as u16, sw);
        }
        assert!(StatusWord::try_from(0x1234).is_err());
    }
}
