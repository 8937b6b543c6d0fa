//! PDU codec for the holding-register function codes
//!
//! Requests are decoded into [`Request`] with all quantity and byte-count
//! checks already applied, so the register handler only has to deal with
//! address ranges. Replies are built as [`Response`] values and encoded into
//! a caller-provided buffer.

use heapless::Vec;

/// Maximum quantity for a read holding registers request
pub const MAX_READ_QUANTITY: u16 = 125;

/// Maximum quantity for a write multiple registers request
pub const MAX_WRITE_QUANTITY: u16 = 123;

/// Bit set on the function code of an exception reply
pub const EXCEPTION_FLAG: u8 = 0x80;

/// Supported function codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum FunctionCode {
    /// Read holding registers
    ReadHoldingRegisters = 0x03,
    /// Write single register
    WriteSingleRegister = 0x06,
    /// Write multiple registers
    WriteMultipleRegisters = 0x10,
}

impl FunctionCode {
    /// Try to convert from u8
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0x03 => Some(Self::ReadHoldingRegisters),
            0x06 => Some(Self::WriteSingleRegister),
            0x10 => Some(Self::WriteMultipleRegisters),
            _ => None,
        }
    }
}

/// Exception codes sent back to the client
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum ExceptionCode {
    /// Function code not supported
    IllegalFunction = 0x01,
    /// Address range outside the register table
    IllegalDataAddress = 0x02,
    /// Quantity or byte count out of range
    IllegalDataValue = 0x03,
}

impl ExceptionCode {
    /// Try to convert from u8
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0x01 => Some(Self::IllegalFunction),
            0x02 => Some(Self::IllegalDataAddress),
            0x03 => Some(Self::IllegalDataValue),
            _ => None,
        }
    }
}

/// PDU decode/encode errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PduError {
    /// PDU too short to read its fixed fields
    Malformed,
    /// Request is well formed but must be answered with an exception
    Illegal {
        /// Function code of the offending request
        function: u8,
        /// Exception to report
        code: ExceptionCode,
    },
    /// Output buffer too small
    BufferTooSmall,
}

impl PduError {
    fn illegal(function: u8, code: ExceptionCode) -> Self {
        Self::Illegal { function, code }
    }
}

/// A decoded register request
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Request {
    /// Read `quantity` registers starting at `address`
    ReadHoldingRegisters { address: u16, quantity: u16 },
    /// Write one register
    WriteSingleRegister { address: u16, value: u16 },
    /// Write consecutive registers starting at `address`
    WriteMultipleRegisters {
        address: u16,
        values: Vec<u16, { MAX_WRITE_QUANTITY as usize }>,
    },
}

fn be16(bytes: &[u8], offset: usize) -> u16 {
    u16::from_be_bytes([bytes[offset], bytes[offset + 1]])
}

impl Request {
    /// Decode a request PDU (function code + data)
    pub fn decode(pdu: &[u8]) -> Result<Self, PduError> {
        let Some(&function) = pdu.first() else {
            return Err(PduError::Malformed);
        };

        match FunctionCode::from_u8(function) {
            Some(FunctionCode::ReadHoldingRegisters) => {
                if pdu.len() < 5 {
                    return Err(PduError::Malformed);
                }
                let address = be16(pdu, 1);
                let quantity = be16(pdu, 3);
                if quantity == 0 || quantity > MAX_READ_QUANTITY {
                    return Err(PduError::illegal(function, ExceptionCode::IllegalDataValue));
                }
                Ok(Self::ReadHoldingRegisters { address, quantity })
            }
            Some(FunctionCode::WriteSingleRegister) => {
                if pdu.len() < 5 {
                    return Err(PduError::Malformed);
                }
                Ok(Self::WriteSingleRegister {
                    address: be16(pdu, 1),
                    value: be16(pdu, 3),
                })
            }
            Some(FunctionCode::WriteMultipleRegisters) => {
                if pdu.len() < 6 {
                    return Err(PduError::Malformed);
                }
                let address = be16(pdu, 1);
                let quantity = be16(pdu, 3);
                let byte_count = pdu[5] as usize;

                let payload_ok = quantity != 0
                    && quantity <= MAX_WRITE_QUANTITY
                    && byte_count == quantity as usize * 2
                    && pdu.len() >= 6 + byte_count;
                if !payload_ok {
                    return Err(PduError::illegal(function, ExceptionCode::IllegalDataValue));
                }

                let values = pdu[6..6 + byte_count]
                    .chunks_exact(2)
                    .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
                    .collect();
                Ok(Self::WriteMultipleRegisters { address, values })
            }
            None => Err(PduError::illegal(function, ExceptionCode::IllegalFunction)),
        }
    }

    /// Function code of this request
    pub fn function(&self) -> FunctionCode {
        match self {
            Self::ReadHoldingRegisters { .. } => FunctionCode::ReadHoldingRegisters,
            Self::WriteSingleRegister { .. } => FunctionCode::WriteSingleRegister,
            Self::WriteMultipleRegisters { .. } => FunctionCode::WriteMultipleRegisters,
        }
    }

    /// Encode this request into `buffer`, returning the PDU length
    #[cfg(test)]
    pub fn encode(&self, buffer: &mut [u8]) -> Result<usize, PduError> {
        match self {
            Self::ReadHoldingRegisters { address, quantity } => {
                put_pair(buffer, self.function() as u8, *address, *quantity)
            }
            Self::WriteSingleRegister { address, value } => {
                put_pair(buffer, self.function() as u8, *address, *value)
            }
            Self::WriteMultipleRegisters { address, values } => {
                let len = 6 + values.len() * 2;
                if buffer.len() < len {
                    return Err(PduError::BufferTooSmall);
                }
                put_pair(buffer, self.function() as u8, *address, values.len() as u16)?;
                buffer[5] = (values.len() * 2) as u8;
                for (slot, value) in buffer[6..len].chunks_exact_mut(2).zip(values) {
                    slot.copy_from_slice(&value.to_be_bytes());
                }
                Ok(len)
            }
        }
    }
}

/// Write `function hi(a) lo(a) hi(b) lo(b)`
fn put_pair(buffer: &mut [u8], function: u8, a: u16, b: u16) -> Result<usize, PduError> {
    if buffer.len() < 5 {
        return Err(PduError::BufferTooSmall);
    }
    buffer[0] = function;
    buffer[1..3].copy_from_slice(&a.to_be_bytes());
    buffer[3..5].copy_from_slice(&b.to_be_bytes());
    Ok(5)
}

/// A reply PDU
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Response {
    /// Register values for a read request
    ReadHoldingRegisters {
        values: Vec<u16, { MAX_READ_QUANTITY as usize }>,
    },
    /// Echo of a single write
    WriteSingleRegister { address: u16, value: u16 },
    /// Acknowledgement of a multiple write
    WriteMultipleRegisters { address: u16, quantity: u16 },
    /// Exception reply
    Exception { function: u8, code: ExceptionCode },
}

impl Response {
    /// Build an exception reply for `function`
    pub fn exception(function: u8, code: ExceptionCode) -> Self {
        Self::Exception {
            function: function & !EXCEPTION_FLAG,
            code,
        }
    }

    /// Encode this reply into `buffer`, returning the PDU length
    pub fn encode(&self, buffer: &mut [u8]) -> Result<usize, PduError> {
        match self {
            Self::ReadHoldingRegisters { values } => {
                let byte_count = values.len() * 2;
                let len = 2 + byte_count;
                if buffer.len() < len {
                    return Err(PduError::BufferTooSmall);
                }
                buffer[0] = FunctionCode::ReadHoldingRegisters as u8;
                buffer[1] = byte_count as u8;
                for (slot, value) in buffer[2..len].chunks_exact_mut(2).zip(values) {
                    slot.copy_from_slice(&value.to_be_bytes());
                }
                Ok(len)
            }
            Self::WriteSingleRegister { address, value } => put_pair(
                buffer,
                FunctionCode::WriteSingleRegister as u8,
                *address,
                *value,
            ),
            Self::WriteMultipleRegisters { address, quantity } => put_pair(
                buffer,
                FunctionCode::WriteMultipleRegisters as u8,
                *address,
                *quantity,
            ),
            Self::Exception { function, code } => {
                if buffer.len() < 2 {
                    return Err(PduError::BufferTooSmall);
                }
                buffer[0] = function | EXCEPTION_FLAG;
                buffer[1] = *code as u8;
                Ok(2)
            }
        }
    }

    /// Decode a reply PDU, as a client would
    pub fn decode(pdu: &[u8]) -> Result<Self, PduError> {
        let Some(&function) = pdu.first() else {
            return Err(PduError::Malformed);
        };

        if function & EXCEPTION_FLAG != 0 {
            let code = pdu
                .get(1)
                .and_then(|&c| ExceptionCode::from_u8(c))
                .ok_or(PduError::Malformed)?;
            return Ok(Self::exception(function, code));
        }

        match FunctionCode::from_u8(function) {
            Some(FunctionCode::ReadHoldingRegisters) => {
                let byte_count = *pdu.get(1).ok_or(PduError::Malformed)? as usize;
                if byte_count % 2 != 0 || pdu.len() < 2 + byte_count {
                    return Err(PduError::Malformed);
                }
                let values = pdu[2..2 + byte_count]
                    .chunks_exact(2)
                    .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
                    .collect::<Vec<u16, 128>>();
                let values = Vec::from_slice(&values).map_err(|_| PduError::Malformed)?;
                Ok(Self::ReadHoldingRegisters { values })
            }
            Some(FunctionCode::WriteSingleRegister) if pdu.len() >= 5 => {
                Ok(Self::WriteSingleRegister {
                    address: be16(pdu, 1),
                    value: be16(pdu, 3),
                })
            }
            Some(FunctionCode::WriteMultipleRegisters) if pdu.len() >= 5 => {
                Ok(Self::WriteMultipleRegisters {
                    address: be16(pdu, 1),
                    quantity: be16(pdu, 3),
                })
            }
            _ => Err(PduError::Malformed),
        }
    }
}
