use crate::errors::{Error, Result};
use crate::packet::packet_sum::Packet;
use crate::packet::single::{self, ParseResult};

/// Pull parser for a packet stream: yields one packet at a time, stopping at
/// the first fatal error.
pub struct PacketParser<'a> {
    input: &'a [u8],
    offset: usize,
    failed: bool,
}

impl<'a> PacketParser<'a> {
    pub fn new(input: &'a [u8]) -> Self {
        PacketParser {
            input,
            offset: 0,
            failed: false,
        }
    }
}

impl Iterator for PacketParser<'_> {
    type Item = Result<Packet>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.input.is_empty() {
            return None;
        }

        match single::parser(self.input) {
            Ok((rest, (version, tag, _length, body))) => {
                self.offset += self.input.len() - rest.len();
                self.input = rest;

                let res = match body {
                    ParseResult::Fixed(body) | ParseResult::Indeterminate(body) => {
                        single::body_parser(version, tag, body, false)
                    }
                    ParseResult::Partial(chunks) => {
                        let body = chunks.concat();
                        single::body_parser(version, tag, &body, true)
                    }
                };

                match res {
                    Ok(packet) => Some(Ok(packet)),
                    Err(err) => {
                        self.failed = true;
                        Some(Err(format_err!("{} at offset {}", err, self.offset)))
                    }
                }
            }
            Err(nom::Err::Incomplete(_)) => {
                self.failed = true;
                Some(Err(Error::PacketIncomplete))
            }
            Err(nom::Err::Error(err)) | Err(nom::Err::Failure(err)) => {
                self.failed = true;
                Some(Err(format_err!("{} at offset {}", err, self.offset)))
            }
        }
    }
}

/// Parse all packets from the given input.
pub fn parser(input: &[u8]) -> Result<Vec<Packet>> {
    PacketParser::new(input).collect()
}
