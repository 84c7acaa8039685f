pub mod capture {
    pub mod domain {
        pub mod frame_source;
    }
    pub mod infrastructure;
}

pub mod detection {
    pub mod domain {
        pub mod detector;
        pub mod face;
        pub mod image_results;
        pub mod metric;
    }
    pub mod infrastructure;
}

pub mod dispatch {
    pub mod async_dispatcher;
    pub mod command;
    pub mod command_queue;
    pub mod detector_worker;
    pub mod dispatch_error;
    pub mod dispatch_logger;
    pub mod result_relay;
    #[cfg(test)]
    mod testing;
}

pub mod session {
    pub mod live_detection_use_case;
}

pub mod shared {
    pub mod config;
    pub mod frame;
    pub mod frame_rate;
    pub mod timestamp;
}
