//! Call-Site Type System
//!
//! Defines the dynamically-typed argument values accepted at a call site, the
//! word type of the native call frame, and the structured call result.

use std::fmt;
use std::io;
use std::marker::PhantomData;
use std::ptr::NonNull;

/// One native argument/return slot (address-sized integer)
pub type Word = usize;

/// Number of word slots in the fixed-arity native call frame
pub const MAX_ARGS: usize = 15;

/// Kind tag of an [`Argument`], used for diagnostics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArgKind {
    I8,
    I16,
    I32,
    I64,
    Isize,
    I128,
    U8,
    U16,
    U32,
    U64,
    Usize,
    U128,
    F32,
    F64,
    Bool,
    /// Read-only byte sequence
    Bytes,
    /// Writable byte sequence
    Buffer,
    /// Platform-native text (UTF-16 on Windows, UTF-8 elsewhere)
    Text,
    /// Byte-encoded (UTF-8) text passed through a pointer
    TextPtr,
    /// Already-resolved native address
    Address,
    PtrI8,
    PtrI16,
    PtrI32,
    PtrI64,
    PtrIsize,
    PtrU8,
    PtrU16,
    PtrU32,
    PtrU64,
    PtrUsize,
    /// No value
    Unit,
}

impl ArgKind {
    /// Check if this kind is passed by value as an integer
    pub fn is_integer(&self) -> bool {
        matches!(
            self,
            ArgKind::I8
                | ArgKind::I16
                | ArgKind::I32
                | ArgKind::I64
                | ArgKind::Isize
                | ArgKind::I128
                | ArgKind::U8
                | ArgKind::U16
                | ArgKind::U32
                | ArgKind::U64
                | ArgKind::Usize
                | ArgKind::U128
        )
    }

    /// Check if this kind is a floating point value
    pub fn is_float(&self) -> bool {
        matches!(self, ArgKind::F32 | ArgKind::F64)
    }

    /// Check if this kind is marshaled as an address
    pub fn is_pointer(&self) -> bool {
        !self.is_integer() && !self.is_float() && *self != ArgKind::Unit
    }
}

impl fmt::Display for ArgKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ArgKind::I8 => "i8",
            ArgKind::I16 => "i16",
            ArgKind::I32 => "i32",
            ArgKind::I64 => "i64",
            ArgKind::Isize => "isize",
            ArgKind::I128 => "i128",
            ArgKind::U8 => "u8",
            ArgKind::U16 => "u16",
            ArgKind::U32 => "u32",
            ArgKind::U64 => "u64",
            ArgKind::Usize => "usize",
            ArgKind::U128 => "u128",
            ArgKind::F32 => "f32",
            ArgKind::F64 => "f64",
            ArgKind::Bool => "bool",
            ArgKind::Bytes => "bytes",
            ArgKind::Buffer => "buffer",
            ArgKind::Text => "text",
            ArgKind::TextPtr => "*text",
            ArgKind::Address => "address",
            ArgKind::PtrI8 => "*i8",
            ArgKind::PtrI16 => "*i16",
            ArgKind::PtrI32 => "*i32",
            ArgKind::PtrI64 => "*i64",
            ArgKind::PtrIsize => "*isize",
            ArgKind::PtrU8 => "*u8",
            ArgKind::PtrU16 => "*u16",
            ArgKind::PtrU32 => "*u32",
            ArgKind::PtrU64 => "*u64",
            ArgKind::PtrUsize => "*usize",
            ArgKind::Unit => "()",
        };
        f.write_str(name)
    }
}

/// Integer types that can be passed by reference
pub trait NativeInt: Copy + sealed::Sealed {
    /// Kind tag of a pointer to this type
    const PTR_KIND: ArgKind;
}

mod sealed {
    pub trait Sealed {}
}

macro_rules! native_int {
    ($($ty:ty => $kind:ident),* $(,)?) => {
        $(
            impl sealed::Sealed for $ty {}
            impl NativeInt for $ty {
                const PTR_KIND: ArgKind = ArgKind::$kind;
            }
        )*
    };
}

native_int! {
    i8 => PtrI8,
    i16 => PtrI16,
    i32 => PtrI32,
    i64 => PtrI64,
    isize => PtrIsize,
    u8 => PtrU8,
    u16 => PtrU16,
    u32 => PtrU32,
    u64 => PtrU64,
    usize => PtrUsize,
}

/// Mutable reference to an integer, passed to native code as its address
///
/// Created from a `&mut T`, so the callee may write through it. Not `Clone`:
/// each `IntRef` is the only writable handle to its integer.
///
/// ```compile_fail
/// use dllcall::Argument;
///
/// let mut total = 0i32;
/// let out = Argument::out(&mut total);
/// let aliased = [out, out];
/// ```
#[derive(Debug)]
pub struct IntRef<'a> {
    ptr: NonNull<u8>,
    kind: ArgKind,
    _marker: PhantomData<&'a mut u8>,
}

impl<'a> IntRef<'a> {
    pub fn new<T: NativeInt>(value: &'a mut T) -> Self {
        Self {
            ptr: NonNull::from(value).cast(),
            kind: T::PTR_KIND,
            _marker: PhantomData,
        }
    }

    /// Address of the referenced integer
    pub fn addr(&self) -> Word {
        self.ptr.as_ptr() as Word
    }

    pub fn kind(&self) -> ArgKind {
        self.kind
    }
}

/// Writable byte sequence, passed to native code as the address of its first byte
///
/// Not `Clone`, for the same reason as [`IntRef`].
#[derive(Debug)]
pub struct OutBuf<'a> {
    ptr: NonNull<u8>,
    len: usize,
    _marker: PhantomData<&'a mut [u8]>,
}

impl<'a> OutBuf<'a> {
    pub fn new(buf: &'a mut [u8]) -> Self {
        let len = buf.len();
        Self {
            ptr: NonNull::from(buf).cast(),
            len,
            _marker: PhantomData,
        }
    }

    pub fn addr(&self) -> Word {
        self.ptr.as_ptr() as Word
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

/// A dynamically-typed call-site value
///
/// Every variant has exactly one marshaling rule into a native word slot; see
/// [`marshal`](super::marshal) for the rule table.
#[derive(Debug)]
pub enum Argument<'a> {
    I8(i8),
    I16(i16),
    I32(i32),
    I64(i64),
    Isize(isize),
    I128(i128),
    U8(u8),
    U16(u16),
    U32(u32),
    U64(u64),
    Usize(usize),
    U128(u128),
    F32(f32),
    F64(f64),
    /// Passed by reference through a transient storage cell
    Bool(bool),
    Bytes(&'a [u8]),
    Buffer(OutBuf<'a>),
    /// Null-terminated platform-native copy
    Text(&'a str),
    /// Null-terminated UTF-8 copy
    TextPtr(&'a str),
    Address(Word),
    IntPtr(IntRef<'a>),
    Unit,
}

impl<'a> Argument<'a> {
    /// Pass an integer by reference (out-parameter)
    pub fn out<T: NativeInt>(value: &'a mut T) -> Self {
        Argument::IntPtr(IntRef::new(value))
    }

    /// Pass a writable byte buffer
    pub fn buffer(buf: &'a mut [u8]) -> Self {
        Argument::Buffer(OutBuf::new(buf))
    }

    /// Pass UTF-8 text through a byte pointer regardless of platform
    pub fn text_ptr(text: &'a str) -> Self {
        Argument::TextPtr(text)
    }

    /// Pass a raw pointer through unchanged
    pub fn address<T>(ptr: *const T) -> Self {
        Argument::Address(ptr as Word)
    }

    /// Get the kind of this value
    pub fn kind(&self) -> ArgKind {
        match self {
            Argument::I8(_) => ArgKind::I8,
            Argument::I16(_) => ArgKind::I16,
            Argument::I32(_) => ArgKind::I32,
            Argument::I64(_) => ArgKind::I64,
            Argument::Isize(_) => ArgKind::Isize,
            Argument::I128(_) => ArgKind::I128,
            Argument::U8(_) => ArgKind::U8,
            Argument::U16(_) => ArgKind::U16,
            Argument::U32(_) => ArgKind::U32,
            Argument::U64(_) => ArgKind::U64,
            Argument::Usize(_) => ArgKind::Usize,
            Argument::U128(_) => ArgKind::U128,
            Argument::F32(_) => ArgKind::F32,
            Argument::F64(_) => ArgKind::F64,
            Argument::Bool(_) => ArgKind::Bool,
            Argument::Bytes(_) => ArgKind::Bytes,
            Argument::Buffer(_) => ArgKind::Buffer,
            Argument::Text(_) => ArgKind::Text,
            Argument::TextPtr(_) => ArgKind::TextPtr,
            Argument::Address(_) => ArgKind::Address,
            Argument::IntPtr(r) => r.kind(),
            Argument::Unit => ArgKind::Unit,
        }
    }
}

macro_rules! argument_from {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for Argument<'_> {
                fn from(value: $ty) -> Self {
                    Argument::$variant(value)
                }
            }
        )*
    };
}

argument_from! {
    i8 => I8,
    i16 => I16,
    i32 => I32,
    i64 => I64,
    isize => Isize,
    i128 => I128,
    u8 => U8,
    u16 => U16,
    u32 => U32,
    u64 => U64,
    usize => Usize,
    u128 => U128,
    f32 => F32,
    f64 => F64,
    bool => Bool,
}

impl<'a> From<&'a str> for Argument<'a> {
    fn from(value: &'a str) -> Self {
        Argument::Text(value)
    }
}

impl<'a> From<&'a String> for Argument<'a> {
    fn from(value: &'a String) -> Self {
        Argument::Text(value.as_str())
    }
}

impl<'a> From<&'a [u8]> for Argument<'a> {
    fn from(value: &'a [u8]) -> Self {
        Argument::Bytes(value)
    }
}

impl<'a> From<&'a Vec<u8>> for Argument<'a> {
    fn from(value: &'a Vec<u8>) -> Self {
        Argument::Bytes(value.as_slice())
    }
}

impl From<()> for Argument<'_> {
    fn from(_: ()) -> Self {
        Argument::Unit
    }
}

/// Platform "last error" code captured right after a native call
///
/// Informational only: a zero code does not prove success and a non-zero
/// code does not prove failure.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Errno(pub i32);

impl Errno {
    pub fn code(&self) -> i32 {
        self.0
    }

    pub fn is_set(&self) -> bool {
        self.0 != 0
    }
}

impl fmt::Display for Errno {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0 == 0 {
            write!(f, "no error (0)")
        } else {
            write!(f, "{}", io::Error::from_raw_os_error(self.0))
        }
    }
}

/// Raw outcome of a native call
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CallResult {
    /// Main return register
    pub primary_word: Word,
    /// High half of a double-width return on 32-bit targets, otherwise 0
    pub secondary_word: Word,
    /// Platform error code read immediately after the call
    pub errno: Errno,
}

impl CallResult {
    pub fn as_i32(&self) -> i32 {
        self.primary_word as i32
    }

    pub fn as_u32(&self) -> u32 {
        self.primary_word as u32
    }

    pub fn as_isize(&self) -> isize {
        self.primary_word as isize
    }

    /// 64-bit return value, joining both words on 32-bit targets
    pub fn as_u64(&self) -> u64 {
        #[cfg(target_pointer_width = "32")]
        {
            ((self.secondary_word as u64) << 32) | self.primary_word as u64
        }
        #[cfg(not(target_pointer_width = "32"))]
        {
            self.primary_word as u64
        }
    }

    pub fn as_i64(&self) -> i64 {
        self.as_u64() as i64
    }

    /// C `bool` return (only the low byte is defined)
    pub fn as_bool(&self) -> bool {
        self.primary_word as u8 != 0
    }

    pub fn errno(&self) -> Errno {
        self.errno
    }
}
