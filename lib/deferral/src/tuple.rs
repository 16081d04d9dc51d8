//! Tuple plumbing for argument lists and joined results.
//!
//! Computations take their arguments as a single tuple: `()` for no arguments, `(A,)` for one, `(A, B)` for two, and
//! so on. Combinators that merge two computations, such as joining or flattening, concatenate the argument tuples of
//! both sides, and joins concatenate their result tuples the same way. Both directions are provided by [`Concat`],
//! which is implemented for left-hand tuples of up to eight elements and right-hand tuples of up to four.
//!
//! Before concatenating results, a binary join brings each result into tuple form with [`IntoTuple`]: tuples are kept
//! as they are, and bare values become one-element tuples.

use std::sync::Arc;

/// Concatenation of two tuples.
pub trait Concat<Rhs>: Sized {
    /// The concatenated tuple.
    type Output;

    /// Concatenates `self` and `rhs`, in that order.
    fn concat(self, rhs: Rhs) -> Self::Output;

    /// Splits a concatenated tuple back into its left-hand and right-hand parts.
    fn split(combined: Self::Output) -> (Self, Rhs);
}

/// Application of a function to the elements of a tuple, as positional arguments.
///
/// Implemented for tuples of up to twelve elements.
pub trait TupleApply<F> {
    /// Return type of the function.
    type Output;

    /// Calls `f` with the elements of this tuple as its arguments.
    fn apply_to(self, f: F) -> Self::Output;
}

/// Conversion of a computation result into tuple form, for concatenation by a join.
///
/// Tuples of up to twelve elements convert to themselves, so joining a computation that already produces a tuple
/// extends that tuple rather than nesting it. The primitive types, `String`, `&str`, `Vec<T>`, `Option<T>`, `Box<T>`
/// and `Arc<T>` convert to a one-element tuple. Results of any other type can be wrapped with
/// [`make_tuple`][crate::make_tuple] before joining, or can implement this trait themselves.
pub trait IntoTuple {
    /// The tuple form.
    type Tuple;

    /// Converts `self` into its tuple form.
    fn into_tuple(self) -> Self::Tuple;
}

macro_rules! impl_into_tuple_for_tuple {
    ($($t:ident),*) => {
        impl<$($t,)*> IntoTuple for ($($t,)*) {
            type Tuple = Self;

            fn into_tuple(self) -> Self {
                self
            }
        }
    };
}

impl_into_tuple_for_tuple!();
impl_into_tuple_for_tuple!(T0);
impl_into_tuple_for_tuple!(T0, T1);
impl_into_tuple_for_tuple!(T0, T1, T2);
impl_into_tuple_for_tuple!(T0, T1, T2, T3);
impl_into_tuple_for_tuple!(T0, T1, T2, T3, T4);
impl_into_tuple_for_tuple!(T0, T1, T2, T3, T4, T5);
impl_into_tuple_for_tuple!(T0, T1, T2, T3, T4, T5, T6);
impl_into_tuple_for_tuple!(T0, T1, T2, T3, T4, T5, T6, T7);
impl_into_tuple_for_tuple!(T0, T1, T2, T3, T4, T5, T6, T7, T8);
impl_into_tuple_for_tuple!(T0, T1, T2, T3, T4, T5, T6, T7, T8, T9);
impl_into_tuple_for_tuple!(T0, T1, T2, T3, T4, T5, T6, T7, T8, T9, T10);
impl_into_tuple_for_tuple!(T0, T1, T2, T3, T4, T5, T6, T7, T8, T9, T10, T11);

macro_rules! impl_into_tuple_for_value {
    ($($ty:ty),*) => {
        $(
            impl IntoTuple for $ty {
                type Tuple = (Self,);

                fn into_tuple(self) -> (Self,) {
                    (self,)
                }
            }
        )*
    };
}

impl_into_tuple_for_value!(bool, char, f32, f64, String);
impl_into_tuple_for_value!(i8, i16, i32, i64, i128, isize);
impl_into_tuple_for_value!(u8, u16, u32, u64, u128, usize);

impl IntoTuple for &str {
    type Tuple = (Self,);

    fn into_tuple(self) -> (Self,) {
        (self,)
    }
}

macro_rules! impl_into_tuple_for_container {
    ($($container:ident),*) => {
        $(
            impl<T> IntoTuple for $container<T> {
                type Tuple = (Self,);

                fn into_tuple(self) -> (Self,) {
                    (self,)
                }
            }
        )*
    };
}

impl_into_tuple_for_container!(Vec, Option, Box, Arc);

macro_rules! impl_concat {
    (($($l:ident),*); ($($r:ident),*)) => {
        impl<$($l,)* $($r,)*> Concat<($($r,)*)> for ($($l,)*) {
            type Output = ($($l,)* $($r,)*);

            #[allow(non_snake_case)]
            fn concat(self, rhs: ($($r,)*)) -> Self::Output {
                let ($($l,)*) = self;
                let ($($r,)*) = rhs;
                ($($l,)* $($r,)*)
            }

            #[allow(non_snake_case)]
            fn split(combined: Self::Output) -> (Self, ($($r,)*)) {
                let ($($l,)* $($r,)*) = combined;
                (($($l,)*), ($($r,)*))
            }
        }
    };
}

macro_rules! impl_concat_for_lhs {
    (@rhs $lhs:tt; [$($done:ident),*]; ) => {
        impl_concat!($lhs; ($($done),*));
    };
    (@rhs $lhs:tt; [$($done:ident),*]; $next:ident $(, $rest:ident)*) => {
        impl_concat!($lhs; ($($done),*));
        impl_concat_for_lhs!(@rhs $lhs; [$($done,)* $next]; $($rest),*);
    };
    ($lhs:tt) => {
        impl_concat_for_lhs!(@rhs $lhs; []; R0, R1, R2, R3);
    };
}

impl_concat_for_lhs!(());
impl_concat_for_lhs!((L0));
impl_concat_for_lhs!((L0, L1));
impl_concat_for_lhs!((L0, L1, L2));
impl_concat_for_lhs!((L0, L1, L2, L3));
impl_concat_for_lhs!((L0, L1, L2, L3, L4));
impl_concat_for_lhs!((L0, L1, L2, L3, L4, L5));
impl_concat_for_lhs!((L0, L1, L2, L3, L4, L5, L6));
impl_concat_for_lhs!((L0, L1, L2, L3, L4, L5, L6, L7));

macro_rules! impl_tuple_apply {
    ($($t:ident),*) => {
        impl<F, R, $($t,)*> TupleApply<F> for ($($t,)*)
        where
            F: FnOnce($($t),*) -> R,
        {
            type Output = R;

            #[allow(non_snake_case)]
            fn apply_to(self, f: F) -> R {
                let ($($t,)*) = self;
                f($($t),*)
            }
        }
    };
}

impl_tuple_apply!();
impl_tuple_apply!(T0);
impl_tuple_apply!(T0, T1);
impl_tuple_apply!(T0, T1, T2);
impl_tuple_apply!(T0, T1, T2, T3);
impl_tuple_apply!(T0, T1, T2, T3, T4);
impl_tuple_apply!(T0, T1, T2, T3, T4, T5);
impl_tuple_apply!(T0, T1, T2, T3, T4, T5, T6);
impl_tuple_apply!(T0, T1, T2, T3, T4, T5, T6, T7);
impl_tuple_apply!(T0, T1, T2, T3, T4, T5, T6, T7, T8);
impl_tuple_apply!(T0, T1, T2, T3, T4, T5, T6, T7, T8, T9);
impl_tuple_apply!(T0, T1, T2, T3, T4, T5, T6, T7, T8, T9, T10);
impl_tuple_apply!(T0, T1, T2, T3, T4, T5, T6, T7, T8, T9, T10, T11);
