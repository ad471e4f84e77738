pub mod solicitation;
