pub mod dispatch_service;
