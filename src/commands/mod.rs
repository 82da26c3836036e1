pub mod distribute;
