//! Transaction Module
//!
//! Canonical Sui transaction data, the argument encoder and builder, the
//! intent signing digest and the serialized signature envelope.

pub mod arguments;
pub mod bcs_types;
pub mod builder;
pub mod digest;
pub mod signature;
pub mod type_tag;


pub use arguments::{encode, CallArgument, EncodedArgument};
pub use bcs_types::*;
pub use builder::{
    BuildSpec, MoveCallSpec, ProgrammableTransactionBuilder, TransactionBuilder, UnsignedTransaction,
    GAS_SAFE_OVERHEAD,
};
pub use digest::{digest, digest_bytes, message_with_intent, Intent, SigningDigest};
pub use signature::{assemble, RawSignatureComponents, SerializedSignature, SignatureScheme};
pub use type_tag::{StructTag, TypeTag, TypeTagError};
