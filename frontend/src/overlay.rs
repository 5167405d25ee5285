/// Minimal 4x5 bitmap font for the FPS overlay. Each glyph is 4 pixels
/// wide, 5 rows tall; bits are MSB-left within each u8 (top 4 bits used).
const GLYPHS: &[(&[u8; 5], u8)] = &[
    // '0'
    (&[0x60, 0x90, 0x90, 0x90, 0x60], b'0'),
    // '1'
    (&[0x20, 0x60, 0x20, 0x20, 0x70], b'1'),
    // '2'
    (&[0x60, 0x90, 0x20, 0x40, 0xF0], b'2'),
    // '3'
    (&[0x60, 0x90, 0x20, 0x90, 0x60], b'3'),
    // '4'
    (&[0x90, 0x90, 0xF0, 0x10, 0x10], b'4'),
    // '5'
    (&[0xF0, 0x80, 0xE0, 0x10, 0xE0], b'5'),
    // '6'
    (&[0x60, 0x80, 0xE0, 0x90, 0x60], b'6'),
    // '7'
    (&[0xF0, 0x10, 0x20, 0x40, 0x40], b'7'),
    // '8'
    (&[0x60, 0x90, 0x60, 0x90, 0x60], b'8'),
    // '9'
    (&[0x60, 0x90, 0x70, 0x10, 0x60], b'9'),
    // '.'
    (&[0x00, 0x00, 0x00, 0x00, 0x40], b'.'),
    // ' '
    (&[0x00, 0x00, 0x00, 0x00, 0x00], b' '),
];

const GLYPH_W: usize = 4;

const WHITE: u16 = 0x7FFF;
const BLACK: u16 = 0x0000;

fn glyph_for(ch: u8) -> &'static [u8; 5] {
    for &(data, c) in GLYPHS {
        if c == ch {
            return data;
        }
    }
    // fallback: space
    &[0x00, 0x00, 0x00, 0x00, 0x00]
}

/// Draw an FPS string (e.g. "60.1") onto a BGR555 framebuffer, top-left,
/// white on a black box so it stays readable over the game.
pub fn draw_fps(buffer: &mut [u16], width: usize, text: &str) {
    let x0: usize = 2;
    let y0: usize = 2;

    // Backing box, one pixel of padding around the text.
    let box_w = text.len() * (GLYPH_W + 1) + 1;
    for py in y0 - 1..y0 + 6 {
        for px in x0 - 1..x0 + box_w {
            if let Some(p) = buffer.get_mut(py * width + px) {
                *p = BLACK;
            }
        }
    }

    for (ci, ch) in text.bytes().enumerate() {
        let glyph = glyph_for(ch);
        let gx = x0 + ci * (GLYPH_W + 1);

        for (row, &bits) in glyph.iter().enumerate() {
            let py = y0 + row;
            for col in 0..GLYPH_W {
                if bits & (0x80 >> col) != 0 {
                    let offset = py * width + gx + col;
                    if let Some(p) = buffer.get_mut(offset) {
                        *p = WHITE;
                    }
                }
            }
        }
    }
}
