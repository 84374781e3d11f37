//! Integration flows across `haber-diamond` and `haber-node`.

pub mod flows;
