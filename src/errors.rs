use diesel::result::Error as DieselError;

error_chain! {
    foreign_links {
        Var(::std::env::VarError);
        ParseInt(::std::num::ParseIntError);
        R2D2(::r2d2::Error);
        Diesel(DieselError);
    }

    errors {
        MissingSecret {
            description("JWT_SECRET is not set")
            display("JWT_SECRET must be set in release builds")
        }
        Migration(reason: String) {
            description("failed to run database migrations")
            display("failed to run database migrations: {}", reason)
        }
    }
}
