//! Dynamic Invocation
//!
//! Marshals call-site arguments and transfers control to a resolved address
//! through one fixed-arity frame of [`MAX_ARGS`] words. Callees that take
//! fewer arguments ignore the extra zeroed slots; callees that take more than
//! [`MAX_ARGS`] cannot be called here.

use tracing::trace;

use super::error::FfiResult;
use super::marshal::CallFrame;
use super::module::Module;
use super::platform;
use super::types::{Argument, CallResult, Errno, Word, MAX_ARGS};

/// The primitive that actually transfers control to native code
pub trait CallPrimitive {
    /// Call `addr` with the first `argc` words of `words` as arguments
    ///
    /// # Safety
    ///
    /// `addr` must be the entry point of a function whose calling convention
    /// and parameters are compatible with `words`.
    unsafe fn invoke(&self, addr: Word, argc: usize, words: &[Word; MAX_ARGS]) -> CallResult;
}

/// C calling convention call with 15 word-sized integer arguments
#[derive(Debug, Clone, Copy, Default)]
pub struct NativeCall;

// Floats travel as bit patterns in integer slots, so every parameter is a word.
#[cfg(target_pointer_width = "64")]
type RawFn = unsafe extern "C" fn(
    Word, Word, Word, Word, Word, Word, Word, Word, Word, Word, Word, Word, Word, Word, Word,
) -> Word;

// 32-bit targets return 64-bit values in a register pair.
#[cfg(not(target_pointer_width = "64"))]
type RawFn = unsafe extern "C" fn(
    Word, Word, Word, Word, Word, Word, Word, Word, Word, Word, Word, Word, Word, Word, Word,
) -> u64;

impl CallPrimitive for NativeCall {
    unsafe fn invoke(&self, addr: Word, _argc: usize, w: &[Word; MAX_ARGS]) -> CallResult {
        let func: RawFn = std::mem::transmute::<Word, RawFn>(addr);

        platform::clear_last_error();
        let ret = func(
            w[0], w[1], w[2], w[3], w[4], w[5], w[6], w[7], w[8], w[9], w[10], w[11], w[12],
            w[13], w[14],
        );
        let errno = platform::last_error();

        split_return(ret, errno)
    }
}

#[cfg(target_pointer_width = "64")]
fn split_return(ret: Word, errno: Errno) -> CallResult {
    CallResult {
        primary_word: ret,
        secondary_word: 0,
        errno,
    }
}

#[cfg(not(target_pointer_width = "64"))]
fn split_return(ret: u64, errno: Errno) -> CallResult {
    CallResult {
        primary_word: ret as Word,
        secondary_word: (ret >> 32) as Word,
        errno,
    }
}

/// Calls functions of one module by name
pub struct Invoker<'m, C: CallPrimitive = NativeCall> {
    module: &'m Module,
    caller: C,
}

impl<'m> Invoker<'m> {
    pub fn new(module: &'m Module) -> Self {
        Self {
            module,
            caller: NativeCall,
        }
    }
}

impl<'m, C: CallPrimitive> Invoker<'m, C> {
    /// Invoker with a custom call primitive
    pub fn with_caller(module: &'m Module, caller: C) -> Self {
        Self { module, caller }
    }

    pub fn module(&self) -> &'m Module {
        self.module
    }

    pub fn caller(&self) -> &C {
        &self.caller
    }

    /// Call the resolved function `name` with `args`
    ///
    /// Fails before any native code runs if the module is not loaded, no
    /// symbol was resolved yet, `name` was never resolved, there are more
    /// than [`MAX_ARGS`] arguments, or an argument cannot be marshaled.
    /// Otherwise the call happens and its raw result is returned; the
    /// callee's own success or failure is not interpreted.
    ///
    /// # Safety
    ///
    /// The caller vouches that `name` really has a C-convention signature
    /// compatible with `args` marshaled per the rule table in
    /// [`marshal`](super::marshal), and that pointers passed as
    /// [`Argument::Address`] are valid for whatever the callee does.
    pub unsafe fn call(&self, name: &str, args: &[Argument<'_>]) -> FfiResult<CallResult> {
        let state = self.module.read_state();
        let addr = state.address_of(name)?;
        let frame = CallFrame::build(args)?;

        trace!(
            function = name,
            addr = format_args!("{:#x}", addr),
            argc = frame.argc(),
            "native call"
        );
        let result = self.caller.invoke(addr, frame.argc(), frame.words());

        // Temporaries in `frame` are released only now, after the call returned.
        drop(frame);
        drop(state);
        Ok(result)
    }
}
