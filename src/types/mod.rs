mod compression;
mod key_id;
mod key_traits;
mod mpi;
mod packet;
mod params;
mod s2k;

pub use self::compression::*;
pub use self::key_id::*;
pub use self::key_traits::*;
pub use self::mpi::*;
pub use self::packet::*;
pub use self::params::*;
pub use self::s2k::*;
