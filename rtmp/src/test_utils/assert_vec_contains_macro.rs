/// Passes if any element of the vector matches the pattern (and optional guard).  The optional
/// `=> expr` runs against every matching element, so it can make further assertions.
macro_rules! assert_vec_contains {
    (@match $vector:expr, $pattern:pat if $cond:expr => $success:expr) => {
        let mut match_count = 0;
        for element in $vector.iter() {
            match element {
                $pattern if $cond => {
                    match_count += 1;
                    $success
                }
                _ => (),
            };
        }

        if match_count == 0 {
            panic!(
                "None of the {} elements matched '{} if {}'.  Elements: {:#?}",
                $vector.len(),
                stringify!($pattern),
                stringify!($cond),
                $vector
            );
        }
    };

    ($vector:expr, $pattern:pat if $cond:expr => $success:expr) => {
        assert_vec_contains!(@match $vector, $pattern if $cond => $success);
    };

    ($vector:expr, $pattern:pat if $cond:expr) => {
        assert_vec_contains!(@match $vector, $pattern if $cond => ());
    };

    ($vector:expr, $pattern:pat => $success:expr) => {
        assert_vec_contains!(@match $vector, $pattern if true => $success);
    };

    ($vector:expr, $pattern:pat) => {
        assert_vec_contains!(@match $vector, $pattern if true => ());
    };
}
