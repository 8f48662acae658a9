pub mod descriptor;
pub mod texture;

/// File name of one texture page, e.g. `myfont_0.png`. The page index is
/// zero padded to the digit count of the last page index so that the
/// names sort correctly.
pub fn page_file_name(base: &str, index: usize, num_pages: usize, ext: &str) -> String {
    let digits = if num_pages > 1 {
        (num_pages - 1).to_string().len()
    } else {
        1
    };
    format!("{}_{:0width$}.{}", base, index, ext, width = digits)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_names_pad_to_last_index() {
        assert_eq!(page_file_name("font", 0, 1, "png"), "font_0.png");
        assert_eq!(page_file_name("font", 3, 10, "png"), "font_3.png");
        assert_eq!(page_file_name("font", 3, 11, "tga"), "font_03.tga");
        assert_eq!(page_file_name("font", 42, 200, "png"), "font_042.png");
    }
}
