macro_rules! print_error {
    ($($arg:tt)*) => {
        eprintln!("[sift error]: {}", format!($($arg)*))
    };
}

macro_rules! print_error_and_exit {
    ($($arg:tt)*) => {
        print_error!($($arg)*);
        crate::exit_codes::ExitCode::Error.exit();
    };
}
