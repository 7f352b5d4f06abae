pub mod applicator_tests;
pub mod concurrency_tests;
pub mod discriminator_tests;
pub mod end_to_end_tests;
pub mod reference_tests;
pub mod walk_tests;
