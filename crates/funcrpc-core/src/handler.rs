//! Glue between plain async functions and the type-erased registry entries.
//!
//! Any `Fn(A1, .., An) -> impl Future<Output = Result<R, E>>` with up to eight
//! [`FromArg`] parameters implements [`RpcHandler`]. The two-output shape is a
//! trait bound, so a callable that does not return `Result` never registers.

use std::fmt;
use std::future::Future;
use std::marker::PhantomData;

use futures::future::BoxFuture;
use serde::Serialize;

use crate::binder::ArgumentBinder;
use crate::encoder::{Outcome, ResultEncoder};
use crate::error::CallError;
use crate::signature::{FromArg, ReturnDescriptor, TypeDescriptor};

/// Future produced once arguments are bound.
pub type CallFuture = BoxFuture<'static, Result<Outcome, CallError>>;

/// A callable that can be registered as a method. `Args` is a marker tuple of
/// the parameter types, so one closure type can only match one arity.
pub trait RpcHandler<Args>: Send + Sync + 'static {
    fn param_types() -> Vec<TypeDescriptor>;

    fn return_types() -> ReturnDescriptor;

    /// Decode every parameter and start the call.
    fn invoke(&self, binder: &mut ArgumentBinder<'_>) -> Result<CallFuture, CallError>;
}

macro_rules! impl_rpc_handler {
    ($($ty:ident),*) => {
        #[allow(non_snake_case, unused_mut, unused_variables, unused_assignments)]
        impl<F, Fut, R, E, $($ty,)*> RpcHandler<($($ty,)*)> for F
        where
            F: Fn($($ty,)*) -> Fut + Send + Sync + 'static,
            Fut: Future<Output = Result<R, E>> + Send + 'static,
            R: Serialize + Send + 'static,
            E: fmt::Display + Send + 'static,
            $($ty: FromArg,)*
        {
            fn param_types() -> Vec<TypeDescriptor> {
                vec![$($ty::descriptor(),)*]
            }

            fn return_types() -> ReturnDescriptor {
                ReturnDescriptor::of::<R, E>()
            }

            fn invoke(&self, binder: &mut ArgumentBinder<'_>) -> Result<CallFuture, CallError> {
                let mut index = 0;
                $(
                    let $ty = binder.bind::<$ty>(index)?;
                    index += 1;
                )*
                let fut = (self)($($ty,)*);
                Ok(Box::pin(async move { ResultEncoder::encode(fut.await) }))
            }
        }
    };
}

impl_rpc_handler!();
impl_rpc_handler!(A1);
impl_rpc_handler!(A1, A2);
impl_rpc_handler!(A1, A2, A3);
impl_rpc_handler!(A1, A2, A3, A4);
impl_rpc_handler!(A1, A2, A3, A4, A5);
impl_rpc_handler!(A1, A2, A3, A4, A5, A6);
impl_rpc_handler!(A1, A2, A3, A4, A5, A6, A7);
impl_rpc_handler!(A1, A2, A3, A4, A5, A6, A7, A8);

/// Object-safe view of an [`RpcHandler`] stored in the registry.
pub(crate) trait ErasedHandler: Send + Sync {
    fn invoke(&self, binder: &mut ArgumentBinder<'_>) -> Result<CallFuture, CallError>;
}

pub(crate) struct FnHandler<F, Args> {
    f: F,
    _marker: PhantomData<fn() -> Args>,
}

impl<F, Args> FnHandler<F, Args> {
    pub(crate) fn new(f: F) -> Self {
        Self {
            f,
            _marker: PhantomData,
        }
    }
}

impl<F, Args> ErasedHandler for FnHandler<F, Args>
where
    F: RpcHandler<Args>,
    Args: 'static,
{
    fn invoke(&self, binder: &mut ArgumentBinder<'_>) -> Result<CallFuture, CallError> {
        self.f.invoke(binder)
    }
}
