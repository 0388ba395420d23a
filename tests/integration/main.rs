mod e2e_test;
mod gateway_test;
