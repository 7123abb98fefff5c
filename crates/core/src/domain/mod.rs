pub mod case;
pub mod damage;
pub mod valuation;
