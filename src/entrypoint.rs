use serde::{Deserialize, Serialize};

macro_rules! entry_points {
    ($($variant:ident => $name:literal),* $(,)?) => {
        /// Every API function the wrapper knows how to intercept.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub enum EntryPoint {
            $(
                #[serde(rename = $name)]
                $variant,
            )*
        }

        impl EntryPoint {
            pub const ALL: &'static [EntryPoint] = &[$(EntryPoint::$variant),*];

            pub fn name(self) -> &'static str {
                match self {
                    $(EntryPoint::$variant => $name,)*
                }
            }
        }
    };
}

entry_points! {
    // errors, debug output
    GlGetError => "glGetError",
    GlDebugMessageCallback => "glDebugMessageCallback",
    GlDebugMessageCallbackArb => "glDebugMessageCallbackARB",
    GlGetIntegerv => "glGetIntegerv",
    GlEnable => "glEnable",
    GlDisable => "glDisable",
    GlViewport => "glViewport",
    GlFlush => "glFlush",
    GlFinish => "glFinish",

    // immediate mode
    GlBegin => "glBegin",
    GlEnd => "glEnd",
    GlVertex3f => "glVertex3f",

    // textures
    GlGenTextures => "glGenTextures",
    GlDeleteTextures => "glDeleteTextures",
    GlBindTexture => "glBindTexture",
    GlActiveTexture => "glActiveTexture",
    GlTexImage2D => "glTexImage2D",
    GlTexStorage2D => "glTexStorage2D",

    // buffers
    GlGenBuffers => "glGenBuffers",
    GlDeleteBuffers => "glDeleteBuffers",
    GlBindBuffer => "glBindBuffer",
    GlBufferData => "glBufferData",

    // framebuffers, renderbuffers
    GlGenFramebuffers => "glGenFramebuffers",
    GlDeleteFramebuffers => "glDeleteFramebuffers",
    GlBindFramebuffer => "glBindFramebuffer",
    GlFramebufferTexture2D => "glFramebufferTexture2D",
    GlFramebufferRenderbuffer => "glFramebufferRenderbuffer",
    GlGenRenderbuffers => "glGenRenderbuffers",
    GlDeleteRenderbuffers => "glDeleteRenderbuffers",
    GlBindRenderbuffer => "glBindRenderbuffer",
    GlRenderbufferStorage => "glRenderbufferStorage",

    // programs, shaders, pipelines
    GlCreateProgram => "glCreateProgram",
    GlDeleteProgram => "glDeleteProgram",
    GlUseProgram => "glUseProgram",
    GlLinkProgram => "glLinkProgram",
    GlAttachShader => "glAttachShader",
    GlDetachShader => "glDetachShader",
    GlCreateShader => "glCreateShader",
    GlDeleteShader => "glDeleteShader",
    GlShaderSource => "glShaderSource",
    GlCompileShader => "glCompileShader",
    GlGenProgramPipelines => "glGenProgramPipelines",
    GlDeleteProgramPipelines => "glDeleteProgramPipelines",
    GlBindProgramPipeline => "glBindProgramPipeline",
    GlUseProgramStages => "glUseProgramStages",

    // draw calls
    GlDrawArrays => "glDrawArrays",
    GlDrawArraysInstanced => "glDrawArraysInstanced",
    GlDrawArraysIndirect => "glDrawArraysIndirect",
    GlDrawElements => "glDrawElements",
    GlDrawElementsInstanced => "glDrawElementsInstanced",
    GlDrawElementsBaseVertex => "glDrawElementsBaseVertex",
    GlDrawElementsIndirect => "glDrawElementsIndirect",
    GlDrawRangeElements => "glDrawRangeElements",
    GlMultiDrawArrays => "glMultiDrawArrays",
    GlMultiDrawElements => "glMultiDrawElements",
    GlClear => "glClear",
    GlClearBufferfv => "glClearBufferfv",
    GlClearBufferiv => "glClearBufferiv",
    GlClearBufferuiv => "glClearBufferuiv",
    GlClearBufferfi => "glClearBufferfi",

    // EGL
    EglGetProcAddress => "eglGetProcAddress",
    EglBindApi => "eglBindAPI",
    EglCreateContext => "eglCreateContext",
    EglMakeCurrent => "eglMakeCurrent",
    EglDestroyContext => "eglDestroyContext",
    EglCreateWindowSurface => "eglCreateWindowSurface",
    EglCreatePbufferSurface => "eglCreatePbufferSurface",
    EglDestroySurface => "eglDestroySurface",
    EglSwapBuffers => "eglSwapBuffers",
    EglReleaseThread => "eglReleaseThread",

    // GLX
    GlxGetProcAddress => "glXGetProcAddress",
    GlxGetProcAddressArb => "glXGetProcAddressARB",
    GlxCreateContext => "glXCreateContext",
    GlxCreateNewContext => "glXCreateNewContext",
    GlxCreateContextAttribsArb => "glXCreateContextAttribsARB",
    GlxMakeCurrent => "glXMakeCurrent",
    GlxMakeContextCurrent => "glXMakeContextCurrent",
    GlxDestroyContext => "glXDestroyContext",
    GlxSwapBuffers => "glXSwapBuffers",

    // WGL
    WglGetProcAddress => "wglGetProcAddress",
    WglCreateContext => "wglCreateContext",
    WglCreateContextAttribsArb => "wglCreateContextAttribsARB",
    WglMakeCurrent => "wglMakeCurrent",
    WglDeleteContext => "wglDeleteContext",
    WglShareLists => "wglShareLists",
    SwapBuffers => "SwapBuffers",
    WglSwapLayerBuffers => "wglSwapLayerBuffers",
}

impl EntryPoint {
    pub const COUNT: usize = Self::ALL.len();

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_name(name: &str) -> Option<EntryPoint> {
        Self::ALL.iter().copied().find(|ep| ep.name() == name)
    }

    pub fn is_draw_call(self) -> bool {
        use EntryPoint::*;
        matches!(
            self,
            GlDrawArrays
                | GlDrawArraysInstanced
                | GlDrawArraysIndirect
                | GlDrawElements
                | GlDrawElementsInstanced
                | GlDrawElementsBaseVertex
                | GlDrawElementsIndirect
                | GlDrawRangeElements
                | GlMultiDrawArrays
                | GlMultiDrawElements
                | GlClear
                | GlClearBufferfv
                | GlClearBufferiv
                | GlClearBufferuiv
                | GlClearBufferfi
        )
    }

    pub fn is_frame_delimiter(self) -> bool {
        use EntryPoint::*;
        matches!(
            self,
            EglSwapBuffers | GlxSwapBuffers | SwapBuffers | WglSwapLayerBuffers
        )
    }
}

impl std::fmt::Display for EntryPoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_matches_position() {
        for (i, ep) in EntryPoint::ALL.iter().enumerate() {
            assert_eq!(ep.index(), i);
        }
    }

    #[test]
    fn test_lookup_by_name() {
        assert_eq!(
            EntryPoint::from_name("glDrawArrays"),
            Some(EntryPoint::GlDrawArrays)
        );
        assert_eq!(EntryPoint::from_name("glNotAFunction"), None);
    }

    #[test]
    fn test_classification() {
        assert!(EntryPoint::GlDrawElements.is_draw_call());
        assert!(EntryPoint::GlClear.is_draw_call());
        assert!(!EntryPoint::GlBindTexture.is_draw_call());
        assert!(EntryPoint::EglSwapBuffers.is_frame_delimiter());
        assert!(!EntryPoint::GlDrawArrays.is_frame_delimiter());
    }

    #[test]
    fn test_serializes_as_api_name() {
        let json = serde_json::to_string(&EntryPoint::GlxMakeCurrent).unwrap();
        assert_eq!(json, "\"glXMakeCurrent\"");
    }
}
