mod test_role_symmetry;
mod test_teardown;
