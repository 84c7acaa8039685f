pub mod simulated_detector;
