//! Basic planning task data types used by the patsel pattern selection crates.

/// Shortcut for tests
#[cfg(any(test, feature = "internal-testing"))]
#[doc(hidden)]
#[macro_export]
macro_rules! var {
    ($x:expr) => {
        $crate::var::Var::from_index($x)
    };
}

/// Shortcut for tests
#[cfg(any(test, feature = "internal-testing"))]
#[doc(hidden)]
#[macro_export]
macro_rules! vars {
    ( $( $x:expr ),* $(,)? ) => { [ $( $crate::var!( $x ) ),* ] };
}

/// Shortcut for tests
#[cfg(any(test, feature = "internal-testing"))]
#[doc(hidden)]
#[macro_export]
macro_rules! fact {
    ($var:expr => $value:expr) => {
        $crate::var::Fact::new($crate::var::Var::from_index($var), $value)
    };
}

/// Shortcut for tests
#[cfg(any(test, feature = "internal-testing"))]
#[doc(hidden)]
#[macro_export]
macro_rules! facts {
    ( $( $var:expr => $value:expr ),* $(,)? ) => {
        [ $( $crate::fact!( $var => $value ) ),* ]
    };
}

pub mod state;
pub mod task;
pub mod var;

#[cfg(any(test, feature = "internal-testing"))]
pub mod test;

pub use state::State;
pub use task::{Effect, Operator, PlanningTask, TaskError};
pub use var::{Fact, Var};
