//! Argument Marshaling
//!
//! Converts call-site [`Argument`]s into the fixed-size word array of a native
//! call frame. The rule table:
//!
//! | Argument | Word |
//! |---|---|
//! | signed / unsigned integer (≤ word width) | sign / zero extended value |
//! | `f32` / `f64` (≤ word width) | IEEE-754 bit pattern, not a numeric conversion |
//! | `bool` | address of a transient `bool` cell |
//! | text | address of a null-terminated platform-native copy |
//! | pointer-to-text | address of a null-terminated UTF-8 copy |
//! | bytes / buffer | address of the first byte (empty is rejected) |
//! | pointer-to-integer | address of the referenced integer |
//! | address | unchanged |
//! | anything else | [`FfiError::UnsupportedArgumentType`] |
//!
//! Transient copies live in the [`CallFrame`] and are released when the frame
//! is dropped, after the native call has returned or on any error path.

use std::ffi::CString;
use std::marker::PhantomData;

use super::error::{FfiError, FfiResult};
use super::types::{Argument, Word, MAX_ARGS};

const WORD_BITS: u32 = Word::BITS;

/// Storage that must outlive the native call (held only for its address)
#[derive(Debug)]
#[allow(dead_code)]
enum Scratch {
    Flag(Box<bool>),
    Narrow(CString),
    Wide(Vec<u16>),
}

/// A marshaled native call frame
///
/// Holds the argument words plus every temporary the words point into. The
/// `'a` lifetime ties the frame to the borrowed call-site values (byte
/// sequences, integer references) whose addresses it carries.
#[derive(Debug)]
pub struct CallFrame<'a> {
    words: [Word; MAX_ARGS],
    argc: usize,
    scratch: Vec<Scratch>,
    _args: PhantomData<&'a ()>,
}

impl<'a> CallFrame<'a> {
    /// Marshal `args` in order into a frame
    ///
    /// Fails without marshaling anything if there are more than [`MAX_ARGS`]
    /// arguments. On a marshaling error every temporary created so far is
    /// released before returning.
    pub fn build(args: &[Argument<'a>]) -> FfiResult<Self> {
        if args.len() > MAX_ARGS {
            return Err(FfiError::TooManyArguments {
                count: args.len(),
                max: MAX_ARGS,
            });
        }

        let mut frame = Self {
            words: [0; MAX_ARGS],
            argc: args.len(),
            scratch: Vec::new(),
            _args: PhantomData,
        };

        for (slot, arg) in args.iter().enumerate() {
            frame.words[slot] = frame.marshal(arg)?;
        }

        Ok(frame)
    }

    /// Argument words; slots past `argc` are zero
    pub fn words(&self) -> &[Word; MAX_ARGS] {
        &self.words
    }

    pub fn argc(&self) -> usize {
        self.argc
    }

    fn marshal(&mut self, arg: &Argument<'a>) -> FfiResult<Word> {
        let word = match arg {
            Argument::I8(v) => *v as isize as Word,
            Argument::I16(v) => *v as isize as Word,
            Argument::I32(v) => *v as isize as Word,
            Argument::I64(v) if WORD_BITS >= 64 => *v as isize as Word,
            Argument::Isize(v) => *v as Word,
            Argument::U8(v) => *v as Word,
            Argument::U16(v) => *v as Word,
            Argument::U32(v) => *v as Word,
            Argument::U64(v) if WORD_BITS >= 64 => *v as Word,
            Argument::Usize(v) => *v,
            Argument::F32(v) => v.to_bits() as Word,
            Argument::F64(v) if WORD_BITS >= 64 => v.to_bits() as Word,
            Argument::Bool(v) => {
                let cell = Box::new(*v);
                let addr = &*cell as *const bool as Word;
                self.scratch.push(Scratch::Flag(cell));
                addr
            }
            Argument::Text(s) => self.native_text(s)?,
            Argument::TextPtr(s) => self.narrow_text(s)?,
            Argument::Bytes(bytes) => {
                if bytes.is_empty() {
                    return Err(FfiError::InvalidArgument(
                        "byte sequence must not be empty".to_string(),
                    ));
                }
                bytes.as_ptr() as Word
            }
            Argument::Buffer(buf) => {
                if buf.is_empty() {
                    return Err(FfiError::InvalidArgument(
                        "byte buffer must not be empty".to_string(),
                    ));
                }
                buf.addr()
            }
            Argument::IntPtr(r) => r.addr(),
            Argument::Address(addr) => *addr,
            other => {
                return Err(FfiError::UnsupportedArgumentType { kind: other.kind() });
            }
        };
        Ok(word)
    }

    fn narrow_text(&mut self, s: &str) -> FfiResult<Word> {
        let c_str = CString::new(s).map_err(|_| {
            FfiError::InvalidArgument(format!("text contains an interior NUL: {:?}", s))
        })?;
        let addr = c_str.as_ptr() as Word;
        self.scratch.push(Scratch::Narrow(c_str));
        Ok(addr)
    }

    #[cfg(windows)]
    fn native_text(&mut self, s: &str) -> FfiResult<Word> {
        if s.contains('\0') {
            return Err(FfiError::InvalidArgument(format!(
                "text contains an interior NUL: {:?}",
                s
            )));
        }
        let wide: Vec<u16> = s.encode_utf16().chain(Some(0)).collect();
        let addr = wide.as_ptr() as Word;
        self.scratch.push(Scratch::Wide(wide));
        Ok(addr)
    }

    #[cfg(not(windows))]
    fn native_text(&mut self, s: &str) -> FfiResult<Word> {
        self.narrow_text(s)
    }
}
