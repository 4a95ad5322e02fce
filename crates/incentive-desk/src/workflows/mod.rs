pub mod incentive;
