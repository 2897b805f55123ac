use crate::errors::DnsError;

pub struct Reader<'a> {
    buffer: &'a [u8],
    position: usize,
}

type Result<T> = std::result::Result<T, DnsError>;

impl<'a> Reader<'a> {
    pub fn new(buffer: &[u8]) -> Reader {
        Reader {
            buffer,
            position: 0,
        }
    }

    pub fn unread_bytes(&self) -> usize {
        self.buffer.len() - self.position
    }

    pub fn read(&mut self, size: usize) -> Result<Vec<u8>> {
        self.take(size).map(<[u8]>::to_vec)
    }

    fn take(&mut self, size: usize) -> Result<&'a [u8]> {
        if size > self.unread_bytes() {
            Err(DnsError::Reader {
                message: format!(
                    "cannot read {} bytes at offset {}, only {} left",
                    size,
                    self.position,
                    self.unread_bytes()
                ),
            })
        } else {
            let buffer = self.buffer;
            self.position += size;
            Ok(&buffer[self.position - size..self.position])
        }
    }

    fn take_array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut result = [0; N];
        result.copy_from_slice(self.take(N)?);
        Ok(result)
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    pub fn read_u16(&mut self) -> Result<u16> {
        Ok(u16::from_be_bytes(self.take_array()?))
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        Ok(u32::from_be_bytes(self.take_array()?))
    }

    pub fn position(&self) -> usize {
        self.position
    }

    /// Reader over the bytes before `end`, starting at `position`.
    /// Both must lie in the already consumed part of the buffer.
    pub fn seek(&self, position: usize, end: usize) -> Result<Self> {
        if position >= end || end > self.position {
            Err(DnsError::Reader {
                message: String::from("Seeking into the future is not allowed!!"),
            })
        } else {
            Ok(Reader {
                buffer: &self.buffer[..end],
                position,
            })
        }
    }
}
